//! Code → type lookup for the AVPs this crate knows about natively.
//!
//! This is deliberately small: only the base-protocol AVPs needed to decode
//! and build CER/CEA/DWR/DWA/DPR/DPA, plus the handful of grouped containers
//! (Failed-AVP, Vendor-Specific-Application-Id, Proxy-Info) that those
//! commands reference. A full code→name/type dictionary covering every AVP
//! ever registered with IANA is a build/codegen concern for a consumer of
//! this crate; `AvpDictionary` is the seam they hook into.

use hashbrown::HashMap;

use super::AvpType;

/// Base-protocol AVP codes (RFC 6733 §4.5), vendor_id 0 unless noted.
pub mod codes {
    pub const USER_NAME: u32 = 1;
    pub const CLASS: u32 = 25;
    pub const SESSION_TIMEOUT: u32 = 27;
    pub const PROXY_STATE: u32 = 33;
    pub const ACCT_SESSION_ID: u32 = 44;
    pub const ACCT_MULTI_SESSION_ID: u32 = 50;
    pub const EVENT_TIMESTAMP: u32 = 55;
    pub const ACCT_INTERIM_INTERVAL: u32 = 85;
    pub const HOST_IP_ADDRESS: u32 = 257;
    pub const AUTH_APPLICATION_ID: u32 = 258;
    pub const ACCT_APPLICATION_ID: u32 = 259;
    pub const VENDOR_SPECIFIC_APPLICATION_ID: u32 = 260;
    pub const REDIRECT_HOST_USAGE: u32 = 261;
    pub const REDIRECT_MAX_CACHE_TIME: u32 = 262;
    pub const SESSION_ID: u32 = 263;
    pub const ORIGIN_HOST: u32 = 264;
    pub const SUPPORTED_VENDOR_ID: u32 = 265;
    pub const VENDOR_ID: u32 = 266;
    pub const FIRMWARE_REVISION: u32 = 267;
    pub const RESULT_CODE: u32 = 268;
    pub const PRODUCT_NAME: u32 = 269;
    pub const SESSION_BINDING: u32 = 270;
    pub const SESSION_SERVER_FAILOVER: u32 = 271;
    pub const MULTI_ROUND_TIME_OUT: u32 = 272;
    pub const DISCONNECT_CAUSE: u32 = 273;
    pub const AUTH_REQUEST_TYPE: u32 = 274;
    pub const AUTH_GRACE_PERIOD: u32 = 276;
    pub const AUTH_SESSION_STATE: u32 = 277;
    pub const ORIGIN_STATE_ID: u32 = 278;
    pub const FAILED_AVP: u32 = 279;
    pub const PROXY_HOST: u32 = 280;
    pub const ERROR_MESSAGE: u32 = 281;
    pub const ROUTE_RECORD: u32 = 282;
    pub const DESTINATION_REALM: u32 = 283;
    pub const PROXY_INFO: u32 = 284;
    pub const RE_AUTH_REQUEST_TYPE: u32 = 285;
    pub const ACCOUNTING_SUB_SESSION_ID: u32 = 287;
    pub const AUTHORIZATION_LIFETIME: u32 = 291;
    pub const REDIRECT_HOST: u32 = 292;
    pub const DESTINATION_HOST: u32 = 293;
    pub const ERROR_REPORTING_HOST: u32 = 294;
    pub const TERMINATION_CAUSE: u32 = 295;
    pub const ORIGIN_REALM: u32 = 296;
    pub const EXPERIMENTAL_RESULT: u32 = 297;
    pub const EXPERIMENTAL_RESULT_CODE: u32 = 298;
    pub const INBAND_SECURITY_ID: u32 = 299;
    pub const ACCOUNTING_RECORD_TYPE: u32 = 480;
    pub const ACCOUNTING_RECORD_NUMBER: u32 = 485;
    pub const ACCOUNTING_REALTIME_REQUIRED: u32 = 483;
}

/// A pluggable AVP code→type lookup. The core only needs this to decide how
/// to decode an AVP it doesn't otherwise have a field-catalogue entry for
/// (e.g. while building `additional_avps`, or inside `find_avps`).
pub trait AvpDictionary: Send + Sync {
    fn lookup(&self, code: u32, vendor_id: u32) -> Option<AvpType>;
}

/// The base-protocol dictionary: enough to decode CER/CEA/DWR/DWA/DPR/DPA and
/// any AVP nested inside their grouped types.
#[derive(Debug, Default, Clone)]
pub struct StaticDictionary {
    extra: HashMap<(u32, u32), AvpType>,
}

impl StaticDictionary {
    pub fn new() -> Self {
        StaticDictionary { extra: HashMap::new() }
    }

    /// Registers (or overrides) the type for a vendor-specific or
    /// application-specific AVP code not covered by the base table.
    pub fn register(&mut self, code: u32, vendor_id: u32, ty: AvpType) {
        self.extra.insert((code, vendor_id), ty);
    }

    fn base_lookup(code: u32, vendor_id: u32) -> Option<AvpType> {
        if vendor_id != 0 {
            return None;
        }
        use codes::*;
        use AvpType::*;
        let ty = match code {
            USER_NAME => Utf8String,
            CLASS => OctetString,
            SESSION_TIMEOUT => Unsigned32,
            PROXY_STATE => OctetString,
            ACCT_SESSION_ID => OctetString,
            ACCT_MULTI_SESSION_ID => Utf8String,
            EVENT_TIMESTAMP => Time,
            ACCT_INTERIM_INTERVAL => Unsigned32,
            HOST_IP_ADDRESS => Address,
            AUTH_APPLICATION_ID => Unsigned32,
            ACCT_APPLICATION_ID => Unsigned32,
            VENDOR_SPECIFIC_APPLICATION_ID => Grouped,
            REDIRECT_HOST_USAGE => Enumerated,
            REDIRECT_MAX_CACHE_TIME => Unsigned32,
            SESSION_ID => Utf8String,
            ORIGIN_HOST => OctetString,
            SUPPORTED_VENDOR_ID => Unsigned32,
            VENDOR_ID => Unsigned32,
            FIRMWARE_REVISION => Unsigned32,
            RESULT_CODE => Unsigned32,
            PRODUCT_NAME => Utf8String,
            SESSION_BINDING => Unsigned32,
            SESSION_SERVER_FAILOVER => Enumerated,
            MULTI_ROUND_TIME_OUT => Unsigned32,
            DISCONNECT_CAUSE => Enumerated,
            AUTH_REQUEST_TYPE => Enumerated,
            AUTH_GRACE_PERIOD => Unsigned32,
            AUTH_SESSION_STATE => Enumerated,
            ORIGIN_STATE_ID => Unsigned32,
            FAILED_AVP => Grouped,
            PROXY_HOST => OctetString,
            ERROR_MESSAGE => Utf8String,
            ROUTE_RECORD => OctetString,
            DESTINATION_REALM => OctetString,
            PROXY_INFO => Grouped,
            RE_AUTH_REQUEST_TYPE => Enumerated,
            ACCOUNTING_SUB_SESSION_ID => Unsigned64,
            AUTHORIZATION_LIFETIME => Unsigned32,
            REDIRECT_HOST => Utf8String,
            DESTINATION_HOST => OctetString,
            ERROR_REPORTING_HOST => OctetString,
            TERMINATION_CAUSE => Enumerated,
            ORIGIN_REALM => OctetString,
            EXPERIMENTAL_RESULT => Grouped,
            EXPERIMENTAL_RESULT_CODE => Unsigned32,
            INBAND_SECURITY_ID => Unsigned32,
            ACCOUNTING_RECORD_TYPE => Enumerated,
            ACCOUNTING_RECORD_NUMBER => Unsigned32,
            ACCOUNTING_REALTIME_REQUIRED => Enumerated,
            _ => return None,
        };
        Some(ty)
    }
}

impl AvpDictionary for StaticDictionary {
    fn lookup(&self, code: u32, vendor_id: u32) -> Option<AvpType> {
        if let Some(ty) = self.extra.get(&(code, vendor_id)) {
            return Some(ty.clone());
        }
        Self::base_lookup(code, vendor_id)
    }
}
