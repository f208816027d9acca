//! Command codes, result codes and other fixed values defined by RFC 6733.

/// Command codes for the base-protocol commands this crate handles locally.
pub mod command_code {
    pub const CAPABILITIES_EXCHANGE: u32 = 257;
    pub const DEVICE_WATCHDOG: u32 = 280;
    pub const DISCONNECT_PEER: u32 = 282;
}

/// Result-Code values the core itself generates or consumes (§6).
pub mod result_code {
    pub const DIAMETER_SUCCESS: u32 = 2001;
    pub const DIAMETER_UNKNOWN_PEER: u32 = 3010;
    pub const DIAMETER_REALM_NOT_SERVED: u32 = 3003;
    pub const DIAMETER_TOO_BUSY: u32 = 3004;
    pub const DIAMETER_APPLICATION_UNSUPPORTED: u32 = 3007;
    pub const DIAMETER_ELECTION_LOST: u32 = 4003;
    pub const DIAMETER_MISSING_AVP: u32 = 5005;
    pub const DIAMETER_NO_COMMON_APPLICATION: u32 = 5010;
    pub const DIAMETER_UNABLE_TO_COMPLY: u32 = 5012;
}

/// `Disconnect-Cause` AVP values (RFC 6733 §5.4.3).
pub mod disconnect_cause {
    pub const REBOOTING: i32 = 0;
    pub const BUSY: i32 = 1;
    pub const DO_NOT_WANT_TO_TALK_TO_YOU: i32 = 2;
}

/// Standard, unencrypted Diameter port.
pub const DEFAULT_PORT: u16 = 3868;
/// Standard TLS/DTLS-protected Diameter port (not implemented by this core).
pub const DEFAULT_SECURE_PORT: u16 = 5658;
/// Common application id used in CER/CEA when a node only speaks the base protocol.
pub const APPLICATION_ID_COMMON: u32 = 0;
