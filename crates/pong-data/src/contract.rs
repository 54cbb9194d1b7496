//! Compile-time ABI definitions for the ping/pong exercise contract.
//!
//! The `sol!` macro generates the event types and their signature topics at
//! compile time, so no ABI JSON file is loaded at runtime.

/// Well-known contract deployments (compile-time constants).
pub mod addresses {
    use alloy::primitives::Address;

    /// Ping/pong exercise contract on Sepolia.
    pub const PING_PONG: Address =
        alloy::primitives::address!("A7F42ff7433cB268dD7D59be62b00c30dEd28d3D");
}

/// Events emitted by the ping/pong contract.
pub mod ping_pong {
    use alloy::sol;

    sol! {
        interface IPingPong {
            /// Emitted by the reference contract. Every ping must be answered.
            event Ping();

            /// Emitted by a bot. Carries the transaction hash of the ping
            /// it answers.
            event Pong(bytes32 txHash);

            /// Emitted when the account allowed to ping changes.
            event NewPinger(address pinger);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ping_pong::IPingPong;
    use alloy::sol_types::SolEvent;

    #[test]
    fn event_signatures_match_contract() {
        assert_eq!(IPingPong::Ping::SIGNATURE, "Ping()");
        assert_eq!(IPingPong::Pong::SIGNATURE, "Pong(bytes32)");
        assert_eq!(IPingPong::NewPinger::SIGNATURE, "NewPinger(address)");
    }
}
