use alloy_primitives::Address;
use alloy_rpc_types_eth::Filter;
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted by the info contract each time `storeInfo(name, data)` is called.
    #[derive(Debug, PartialEq)]
    event InfoStored(address indexed sender, string name, string data, uint256 timestamp);
}

/// Log filter for InfoStored emissions from the monitored contract over an
/// inclusive block range.
pub fn info_stored_filter(contract: Address, from_block: u64, to_block: u64) -> Filter {
    Filter::new()
        .address(contract)
        .event_signature(InfoStored::SIGNATURE_HASH)
        .from_block(from_block)
        .to_block(to_block)
}
