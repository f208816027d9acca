//! The handful of command pairs this core understands natively:
//! Capabilities-Exchange, Device-Watchdog and Disconnect-Peer. Everything
//! else decodes to [`CommandKind::Undefined`] and is carried as a plain
//! [`Message`] — a concrete application built on this crate supplies its own
//! catalogues for its own commands the same way these are built here.

use crate::avp::{Avp, AvpValue};
use crate::constants::command_code;
use crate::error::{AvpEncodeError, MessageError};
use crate::message::catalogue::{avps_from_attributes, populate_from_avps, FieldDef};
use crate::message::{CommandFlags, Message, MessageHeader};

/// Generates the `assign`/`generate` pair for a scalar `Option<T>` field
/// bound to one `AvpValue` variant.
macro_rules! scalar_opt_field {
    ($assign_fn:ident, $generate_fn:ident, $struct:ty, $field:ident, $variant:ident) => {
        fn $assign_fn(obj: &mut $struct, avp: &Avp) {
            if let AvpValue::$variant(v) = &avp.value {
                obj.$field = Some(v.clone());
            }
        }
        fn $generate_fn(obj: &$struct) -> Vec<AvpValue> {
            match &obj.$field {
                Some(v) => vec![AvpValue::$variant(v.clone())],
                None => Vec::new(),
            }
        }
    };
}

/// Generates the `assign`/`generate` pair for a `Vec<T>`-typed (list) field
/// bound to one `AvpValue` variant: each matching AVP appends, and encoding
/// emits one AVP per element.
macro_rules! list_field {
    ($assign_fn:ident, $generate_fn:ident, $struct:ty, $field:ident, $variant:ident) => {
        fn $assign_fn(obj: &mut $struct, avp: &Avp) {
            if let AvpValue::$variant(v) = &avp.value {
                obj.$field.push(v.clone());
            }
        }
        fn $generate_fn(obj: &$struct) -> Vec<AvpValue> {
            obj.$field.iter().cloned().map(AvpValue::$variant).collect()
        }
    };
}

/// Generates the `assign`/`generate` pair for a singular nested grouped AVP,
/// recursing into the nested type's own `from_avps`/`to_avps`.
macro_rules! grouped_opt_field {
    ($assign_fn:ident, $generate_fn:ident, $struct:ty, $field:ident, $nested:ty) => {
        fn $assign_fn(obj: &mut $struct, avp: &Avp) {
            if let Some(children) = avp.value.as_grouped() {
                obj.$field = Some(<$nested>::from_avps(children));
            }
        }
        fn $generate_fn(obj: &$struct) -> Vec<AvpValue> {
            match &obj.$field {
                Some(nested) => vec![AvpValue::Grouped(nested.to_avps())],
                None => Vec::new(),
            }
        }
    };
}

/// Same as [`grouped_opt_field`] but for a `Vec<Nested>` (list of grouped AVPs).
macro_rules! grouped_list_field {
    ($assign_fn:ident, $generate_fn:ident, $struct:ty, $field:ident, $nested:ty) => {
        fn $assign_fn(obj: &mut $struct, avp: &Avp) {
            if let Some(children) = avp.value.as_grouped() {
                obj.$field.push(<$nested>::from_avps(children));
            }
        }
        fn $generate_fn(obj: &$struct) -> Vec<AvpValue> {
            obj.$field.iter().map(|nested| AvpValue::Grouped(nested.to_avps())).collect()
        }
    };
}

use crate::avp::dictionary::codes;

// ---------------------------------------------------------------------
// Failed-AVP: just a bag of the AVPs that failed validation.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailedAvp {
    pub additional_avps: Vec<Avp>,
}

impl FailedAvp {
    pub fn from_avps(avps: &[Avp]) -> Self {
        FailedAvp { additional_avps: avps.to_vec() }
    }

    pub fn to_avps(&self) -> Vec<Avp> {
        self.additional_avps.clone()
    }
}

// ---------------------------------------------------------------------
// Vendor-Specific-Application-Id
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorSpecificApplicationId {
    pub vendor_id: Option<u32>,
    pub auth_application_id: Option<u32>,
    pub acct_application_id: Option<u32>,
    pub additional_avps: Vec<Avp>,
}

scalar_opt_field!(vsai_assign_vendor_id, vsai_gen_vendor_id, VendorSpecificApplicationId, vendor_id, Unsigned32);
scalar_opt_field!(vsai_assign_auth_app, vsai_gen_auth_app, VendorSpecificApplicationId, auth_application_id, Unsigned32);
scalar_opt_field!(vsai_assign_acct_app, vsai_gen_acct_app, VendorSpecificApplicationId, acct_application_id, Unsigned32);

impl VendorSpecificApplicationId {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "vendor_id", avp_code: codes::VENDOR_ID, vendor_id: 0, is_required: true, is_mandatory: None, assign: vsai_assign_vendor_id, generate: vsai_gen_vendor_id },
            FieldDef { attr_name: "auth_application_id", avp_code: codes::AUTH_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: vsai_assign_auth_app, generate: vsai_gen_auth_app },
            FieldDef { attr_name: "acct_application_id", avp_code: codes::ACCT_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: vsai_assign_acct_app, generate: vsai_gen_acct_app },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Vec<Avp> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, false)
            .expect("non-strict generation never fails")
    }
}

// ---------------------------------------------------------------------
// Proxy-Info
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyInfo {
    pub proxy_host: Option<Vec<u8>>,
    pub proxy_state: Option<Vec<u8>>,
    pub additional_avps: Vec<Avp>,
}

scalar_opt_field!(pi_assign_host, pi_gen_host, ProxyInfo, proxy_host, OctetString);
scalar_opt_field!(pi_assign_state, pi_gen_state, ProxyInfo, proxy_state, OctetString);

impl ProxyInfo {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "proxy_host", avp_code: codes::PROXY_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: pi_assign_host, generate: pi_gen_host },
            FieldDef { attr_name: "proxy_state", avp_code: codes::PROXY_STATE, vendor_id: 0, is_required: true, is_mandatory: None, assign: pi_assign_state, generate: pi_gen_state },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Vec<Avp> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, false)
            .expect("non-strict generation never fails")
    }
}

macro_rules! define_command {
    ($name:ident { $($field:ident : $fty:ty,)* }) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(pub $field: $fty,)*
            pub additional_avps: Vec<Avp>,
        }
    };
}

define_command!(CapabilitiesExchangeRequest {
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    host_ip_address: Vec<crate::avp::AvpAddress>,
    vendor_id: Option<u32>,
    product_name: Option<String>,
    origin_state_id: Option<u32>,
    supported_vendor_id: Vec<u32>,
    auth_application_id: Vec<u32>,
    inband_security_id: Vec<u32>,
    acct_application_id: Vec<u32>,
    vendor_specific_application_id: Vec<VendorSpecificApplicationId>,
    firmware_revision: Option<u32>,
});

define_command!(CapabilitiesExchangeAnswer {
    result_code: Option<u32>,
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    host_ip_address: Vec<crate::avp::AvpAddress>,
    vendor_id: Option<u32>,
    product_name: Option<String>,
    origin_state_id: Option<u32>,
    error_message: Option<String>,
    failed_avp: Option<FailedAvp>,
    supported_vendor_id: Vec<u32>,
    auth_application_id: Vec<u32>,
    inband_security_id: Vec<u32>,
    acct_application_id: Vec<u32>,
    vendor_specific_application_id: Vec<VendorSpecificApplicationId>,
    firmware_revision: Option<u32>,
});

define_command!(DeviceWatchdogRequest {
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    origin_state_id: Option<u32>,
});

define_command!(DeviceWatchdogAnswer {
    result_code: Option<u32>,
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    error_message: Option<String>,
    failed_avp: Option<FailedAvp>,
    origin_state_id: Option<u32>,
});

define_command!(DisconnectPeerRequest {
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    disconnect_cause: Option<i32>,
});

define_command!(DisconnectPeerAnswer {
    result_code: Option<u32>,
    origin_host: Option<Vec<u8>>,
    origin_realm: Option<Vec<u8>>,
    error_message: Option<String>,
    failed_avp: Option<FailedAvp>,
});

scalar_opt_field!(cer_assign_origin_host, cer_gen_origin_host, CapabilitiesExchangeRequest, origin_host, OctetString);
scalar_opt_field!(cer_assign_origin_realm, cer_gen_origin_realm, CapabilitiesExchangeRequest, origin_realm, OctetString);
scalar_opt_field!(cer_assign_vendor_id, cer_gen_vendor_id, CapabilitiesExchangeRequest, vendor_id, Unsigned32);
scalar_opt_field!(cer_assign_product_name, cer_gen_product_name, CapabilitiesExchangeRequest, product_name, Utf8String);
scalar_opt_field!(cer_assign_origin_state_id, cer_gen_origin_state_id, CapabilitiesExchangeRequest, origin_state_id, Unsigned32);
list_field!(cer_assign_supported_vendor_id, cer_gen_supported_vendor_id, CapabilitiesExchangeRequest, supported_vendor_id, Unsigned32);
list_field!(cer_assign_auth_app, cer_gen_auth_app, CapabilitiesExchangeRequest, auth_application_id, Unsigned32);
list_field!(cer_assign_inband_sec, cer_gen_inband_sec, CapabilitiesExchangeRequest, inband_security_id, Unsigned32);
list_field!(cer_assign_acct_app, cer_gen_acct_app, CapabilitiesExchangeRequest, acct_application_id, Unsigned32);
grouped_list_field!(cer_assign_vsai, cer_gen_vsai, CapabilitiesExchangeRequest, vendor_specific_application_id, VendorSpecificApplicationId);
scalar_opt_field!(cer_assign_firmware, cer_gen_firmware, CapabilitiesExchangeRequest, firmware_revision, Unsigned32);

fn cer_assign_host_ip_addr(obj: &mut CapabilitiesExchangeRequest, avp: &Avp) {
    if let AvpValue::Address(a) = &avp.value {
        obj.host_ip_address.push(a.clone());
    }
}
fn cer_gen_host_ip_addr(obj: &CapabilitiesExchangeRequest) -> Vec<AvpValue> {
    obj.host_ip_address.iter().cloned().map(AvpValue::Address).collect()
}

impl CapabilitiesExchangeRequest {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: cer_assign_origin_host, generate: cer_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: cer_assign_origin_realm, generate: cer_gen_origin_realm },
            FieldDef { attr_name: "host_ip_address", avp_code: codes::HOST_IP_ADDRESS, vendor_id: 0, is_required: true, is_mandatory: None, assign: cer_assign_host_ip_addr, generate: cer_gen_host_ip_addr },
            FieldDef { attr_name: "vendor_id", avp_code: codes::VENDOR_ID, vendor_id: 0, is_required: true, is_mandatory: None, assign: cer_assign_vendor_id, generate: cer_gen_vendor_id },
            FieldDef { attr_name: "product_name", avp_code: codes::PRODUCT_NAME, vendor_id: 0, is_required: true, is_mandatory: Some(false), assign: cer_assign_product_name, generate: cer_gen_product_name },
            FieldDef { attr_name: "origin_state_id", avp_code: codes::ORIGIN_STATE_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_origin_state_id, generate: cer_gen_origin_state_id },
            FieldDef { attr_name: "supported_vendor_id", avp_code: codes::SUPPORTED_VENDOR_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_supported_vendor_id, generate: cer_gen_supported_vendor_id },
            FieldDef { attr_name: "auth_application_id", avp_code: codes::AUTH_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_auth_app, generate: cer_gen_auth_app },
            FieldDef { attr_name: "inband_security_id", avp_code: codes::INBAND_SECURITY_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_inband_sec, generate: cer_gen_inband_sec },
            FieldDef { attr_name: "acct_application_id", avp_code: codes::ACCT_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_acct_app, generate: cer_gen_acct_app },
            FieldDef { attr_name: "vendor_specific_application_id", avp_code: codes::VENDOR_SPECIFIC_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cer_assign_vsai, generate: cer_gen_vsai },
            FieldDef { attr_name: "firmware_revision", avp_code: codes::FIRMWARE_REVISION, vendor_id: 0, is_required: false, is_mandatory: Some(false), assign: cer_assign_firmware, generate: cer_gen_firmware },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: false, error: false, retransmit: false },
            command_code: command_code::CAPABILITIES_EXCHANGE,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

scalar_opt_field!(cea_assign_result_code, cea_gen_result_code, CapabilitiesExchangeAnswer, result_code, Unsigned32);
scalar_opt_field!(cea_assign_origin_host, cea_gen_origin_host, CapabilitiesExchangeAnswer, origin_host, OctetString);
scalar_opt_field!(cea_assign_origin_realm, cea_gen_origin_realm, CapabilitiesExchangeAnswer, origin_realm, OctetString);
scalar_opt_field!(cea_assign_vendor_id, cea_gen_vendor_id, CapabilitiesExchangeAnswer, vendor_id, Unsigned32);
scalar_opt_field!(cea_assign_product_name, cea_gen_product_name, CapabilitiesExchangeAnswer, product_name, Utf8String);
scalar_opt_field!(cea_assign_origin_state_id, cea_gen_origin_state_id, CapabilitiesExchangeAnswer, origin_state_id, Unsigned32);
scalar_opt_field!(cea_assign_error_message, cea_gen_error_message, CapabilitiesExchangeAnswer, error_message, Utf8String);
grouped_opt_field!(cea_assign_failed_avp, cea_gen_failed_avp, CapabilitiesExchangeAnswer, failed_avp, FailedAvp);
list_field!(cea_assign_supported_vendor_id, cea_gen_supported_vendor_id, CapabilitiesExchangeAnswer, supported_vendor_id, Unsigned32);
list_field!(cea_assign_auth_app, cea_gen_auth_app, CapabilitiesExchangeAnswer, auth_application_id, Unsigned32);
list_field!(cea_assign_inband_sec, cea_gen_inband_sec, CapabilitiesExchangeAnswer, inband_security_id, Unsigned32);
list_field!(cea_assign_acct_app, cea_gen_acct_app, CapabilitiesExchangeAnswer, acct_application_id, Unsigned32);
grouped_list_field!(cea_assign_vsai, cea_gen_vsai, CapabilitiesExchangeAnswer, vendor_specific_application_id, VendorSpecificApplicationId);
scalar_opt_field!(cea_assign_firmware, cea_gen_firmware, CapabilitiesExchangeAnswer, firmware_revision, Unsigned32);

fn cea_assign_host_ip_addr(obj: &mut CapabilitiesExchangeAnswer, avp: &Avp) {
    if let AvpValue::Address(a) = &avp.value {
        obj.host_ip_address.push(a.clone());
    }
}
fn cea_gen_host_ip_addr(obj: &CapabilitiesExchangeAnswer) -> Vec<AvpValue> {
    obj.host_ip_address.iter().cloned().map(AvpValue::Address).collect()
}

impl CapabilitiesExchangeAnswer {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "result_code", avp_code: codes::RESULT_CODE, vendor_id: 0, is_required: true, is_mandatory: None, assign: cea_assign_result_code, generate: cea_gen_result_code },
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: cea_assign_origin_host, generate: cea_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: cea_assign_origin_realm, generate: cea_gen_origin_realm },
            FieldDef { attr_name: "host_ip_address", avp_code: codes::HOST_IP_ADDRESS, vendor_id: 0, is_required: true, is_mandatory: None, assign: cea_assign_host_ip_addr, generate: cea_gen_host_ip_addr },
            FieldDef { attr_name: "vendor_id", avp_code: codes::VENDOR_ID, vendor_id: 0, is_required: true, is_mandatory: None, assign: cea_assign_vendor_id, generate: cea_gen_vendor_id },
            FieldDef { attr_name: "product_name", avp_code: codes::PRODUCT_NAME, vendor_id: 0, is_required: true, is_mandatory: Some(false), assign: cea_assign_product_name, generate: cea_gen_product_name },
            FieldDef { attr_name: "origin_state_id", avp_code: codes::ORIGIN_STATE_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_origin_state_id, generate: cea_gen_origin_state_id },
            FieldDef { attr_name: "error_message", avp_code: codes::ERROR_MESSAGE, vendor_id: 0, is_required: false, is_mandatory: Some(false), assign: cea_assign_error_message, generate: cea_gen_error_message },
            FieldDef { attr_name: "failed_avp", avp_code: codes::FAILED_AVP, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_failed_avp, generate: cea_gen_failed_avp },
            FieldDef { attr_name: "supported_vendor_id", avp_code: codes::SUPPORTED_VENDOR_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_supported_vendor_id, generate: cea_gen_supported_vendor_id },
            FieldDef { attr_name: "auth_application_id", avp_code: codes::AUTH_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_auth_app, generate: cea_gen_auth_app },
            FieldDef { attr_name: "inband_security_id", avp_code: codes::INBAND_SECURITY_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_inband_sec, generate: cea_gen_inband_sec },
            FieldDef { attr_name: "acct_application_id", avp_code: codes::ACCT_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_acct_app, generate: cea_gen_acct_app },
            FieldDef { attr_name: "vendor_specific_application_id", avp_code: codes::VENDOR_SPECIFIC_APPLICATION_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: cea_assign_vsai, generate: cea_gen_vsai },
            FieldDef { attr_name: "firmware_revision", avp_code: codes::FIRMWARE_REVISION, vendor_id: 0, is_required: false, is_mandatory: Some(false), assign: cea_assign_firmware, generate: cea_gen_firmware },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: false, proxiable: false, error: false, retransmit: false },
            command_code: command_code::CAPABILITIES_EXCHANGE,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

scalar_opt_field!(dwr_assign_origin_host, dwr_gen_origin_host, DeviceWatchdogRequest, origin_host, OctetString);
scalar_opt_field!(dwr_assign_origin_realm, dwr_gen_origin_realm, DeviceWatchdogRequest, origin_realm, OctetString);
scalar_opt_field!(dwr_assign_origin_state_id, dwr_gen_origin_state_id, DeviceWatchdogRequest, origin_state_id, Unsigned32);

impl DeviceWatchdogRequest {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: dwr_assign_origin_host, generate: dwr_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: dwr_assign_origin_realm, generate: dwr_gen_origin_realm },
            FieldDef { attr_name: "origin_state_id", avp_code: codes::ORIGIN_STATE_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: dwr_assign_origin_state_id, generate: dwr_gen_origin_state_id },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: false, error: false, retransmit: false },
            command_code: command_code::DEVICE_WATCHDOG,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

scalar_opt_field!(dwa_assign_result_code, dwa_gen_result_code, DeviceWatchdogAnswer, result_code, Unsigned32);
scalar_opt_field!(dwa_assign_origin_host, dwa_gen_origin_host, DeviceWatchdogAnswer, origin_host, OctetString);
scalar_opt_field!(dwa_assign_origin_realm, dwa_gen_origin_realm, DeviceWatchdogAnswer, origin_realm, OctetString);
scalar_opt_field!(dwa_assign_error_message, dwa_gen_error_message, DeviceWatchdogAnswer, error_message, Utf8String);
grouped_opt_field!(dwa_assign_failed_avp, dwa_gen_failed_avp, DeviceWatchdogAnswer, failed_avp, FailedAvp);
scalar_opt_field!(dwa_assign_origin_state_id, dwa_gen_origin_state_id, DeviceWatchdogAnswer, origin_state_id, Unsigned32);

impl DeviceWatchdogAnswer {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "result_code", avp_code: codes::RESULT_CODE, vendor_id: 0, is_required: true, is_mandatory: None, assign: dwa_assign_result_code, generate: dwa_gen_result_code },
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: dwa_assign_origin_host, generate: dwa_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: dwa_assign_origin_realm, generate: dwa_gen_origin_realm },
            FieldDef { attr_name: "error_message", avp_code: codes::ERROR_MESSAGE, vendor_id: 0, is_required: false, is_mandatory: Some(false), assign: dwa_assign_error_message, generate: dwa_gen_error_message },
            FieldDef { attr_name: "failed_avp", avp_code: codes::FAILED_AVP, vendor_id: 0, is_required: false, is_mandatory: None, assign: dwa_assign_failed_avp, generate: dwa_gen_failed_avp },
            FieldDef { attr_name: "origin_state_id", avp_code: codes::ORIGIN_STATE_ID, vendor_id: 0, is_required: false, is_mandatory: None, assign: dwa_assign_origin_state_id, generate: dwa_gen_origin_state_id },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: false, proxiable: false, error: false, retransmit: false },
            command_code: command_code::DEVICE_WATCHDOG,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

scalar_opt_field!(dpr_assign_origin_host, dpr_gen_origin_host, DisconnectPeerRequest, origin_host, OctetString);
scalar_opt_field!(dpr_assign_origin_realm, dpr_gen_origin_realm, DisconnectPeerRequest, origin_realm, OctetString);
scalar_opt_field!(dpr_assign_disconnect_cause, dpr_gen_disconnect_cause, DisconnectPeerRequest, disconnect_cause, Integer32);

impl DisconnectPeerRequest {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpr_assign_origin_host, generate: dpr_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpr_assign_origin_realm, generate: dpr_gen_origin_realm },
            FieldDef { attr_name: "disconnect_cause", avp_code: codes::DISCONNECT_CAUSE, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpr_assign_disconnect_cause, generate: dpr_gen_disconnect_cause },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: false, error: false, retransmit: false },
            command_code: command_code::DISCONNECT_PEER,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

scalar_opt_field!(dpa_assign_result_code, dpa_gen_result_code, DisconnectPeerAnswer, result_code, Unsigned32);
scalar_opt_field!(dpa_assign_origin_host, dpa_gen_origin_host, DisconnectPeerAnswer, origin_host, OctetString);
scalar_opt_field!(dpa_assign_origin_realm, dpa_gen_origin_realm, DisconnectPeerAnswer, origin_realm, OctetString);
scalar_opt_field!(dpa_assign_error_message, dpa_gen_error_message, DisconnectPeerAnswer, error_message, Utf8String);
grouped_opt_field!(dpa_assign_failed_avp, dpa_gen_failed_avp, DisconnectPeerAnswer, failed_avp, FailedAvp);

impl DisconnectPeerAnswer {
    fn catalogue() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef { attr_name: "result_code", avp_code: codes::RESULT_CODE, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpa_assign_result_code, generate: dpa_gen_result_code },
            FieldDef { attr_name: "origin_host", avp_code: codes::ORIGIN_HOST, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpa_assign_origin_host, generate: dpa_gen_origin_host },
            FieldDef { attr_name: "origin_realm", avp_code: codes::ORIGIN_REALM, vendor_id: 0, is_required: true, is_mandatory: None, assign: dpa_assign_origin_realm, generate: dpa_gen_origin_realm },
            FieldDef { attr_name: "error_message", avp_code: codes::ERROR_MESSAGE, vendor_id: 0, is_required: false, is_mandatory: Some(false), assign: dpa_assign_error_message, generate: dpa_gen_error_message },
            FieldDef { attr_name: "failed_avp", avp_code: codes::FAILED_AVP, vendor_id: 0, is_required: false, is_mandatory: None, assign: dpa_assign_failed_avp, generate: dpa_gen_failed_avp },
        ]
    }

    pub fn from_avps(avps: &[Avp]) -> Self {
        let mut obj = Self::default();
        let mut additional = Vec::new();
        populate_from_avps(&mut obj, &Self::catalogue(), avps, &mut additional);
        obj.additional_avps = additional;
        obj
    }

    pub fn to_avps(&self) -> Result<Vec<Avp>, AvpEncodeError> {
        avps_from_attributes(self, &Self::catalogue(), &self.additional_avps, true)
    }

    pub fn into_message(self, hop_by_hop_id: u32, end_to_end_id: u32) -> Result<Message, AvpEncodeError> {
        let avps = self.to_avps()?;
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: false, proxiable: false, error: false, retransmit: false },
            command_code: command_code::DISCONNECT_PEER,
            application_id: 0,
            hop_by_hop_id,
            end_to_end_id,
        };
        Ok(Message::new(header, avps))
    }
}

/// A decoded message, resolved to one of the commands this core understands
/// natively, or carried as a plain envelope if it isn't one of them.
#[derive(Debug, Clone)]
pub enum CommandKind {
    Cer(CapabilitiesExchangeRequest),
    Cea(CapabilitiesExchangeAnswer),
    Dwr(DeviceWatchdogRequest),
    Dwa(DeviceWatchdogAnswer),
    Dpr(DisconnectPeerRequest),
    Dpa(DisconnectPeerAnswer),
    Undefined(Message),
}

/// Resolves a freshly decoded header+AVP list to a `CommandKind`, the
/// explicit `type_factory(header) -> type` hook the upstream string-matching
/// dispatch is recast into.
pub fn type_factory(header: &MessageHeader, avps: Vec<Avp>) -> CommandKind {
    match header.command_code {
        command_code::CAPABILITIES_EXCHANGE => {
            if header.is_request() {
                CommandKind::Cer(CapabilitiesExchangeRequest::from_avps(&avps))
            } else {
                CommandKind::Cea(CapabilitiesExchangeAnswer::from_avps(&avps))
            }
        }
        command_code::DEVICE_WATCHDOG => {
            if header.is_request() {
                CommandKind::Dwr(DeviceWatchdogRequest::from_avps(&avps))
            } else {
                CommandKind::Dwa(DeviceWatchdogAnswer::from_avps(&avps))
            }
        }
        command_code::DISCONNECT_PEER => {
            if header.is_request() {
                CommandKind::Dpr(DisconnectPeerRequest::from_avps(&avps))
            } else {
                CommandKind::Dpa(DisconnectPeerAnswer::from_avps(&avps))
            }
        }
        _ => CommandKind::Undefined(Message::new(*header, avps)),
    }
}

/// Decodes a full Diameter message off the wire and resolves it to a
/// [`CommandKind`] in one step.
pub fn decode_command(bytes: &[u8], dict: &dyn crate::avp::dictionary::AvpDictionary) -> Result<CommandKind, MessageError> {
    let msg = Message::decode(bytes, dict)?;
    Ok(type_factory(&msg.header, msg.avps))
}
