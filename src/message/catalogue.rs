//! The attribute mapper: converts between a flat AVP list and strongly typed
//! command fields, driven by an ordered field-catalogue descriptor.
//!
//! Upstream drives this with runtime reflection (`setattr`/`getattr` against
//! a `NamedTuple` catalogue and a `type_class` hook for nested grouped AVPs).
//! Here each descriptor instead carries a pair of plain functions — `assign`
//! to fold one matched AVP into the target struct, `generate` to produce the
//! zero-or-more logical values a field contributes on encode — so grouped
//! nesting is just a closure recursing into the nested type's own catalogue,
//! with no reflection involved.

use crate::avp::{Avp, AvpValue};
use crate::error::AvpEncodeError;

/// One entry in a command's field catalogue.
pub struct FieldDef<T> {
    pub attr_name: &'static str,
    pub avp_code: u32,
    pub vendor_id: u32,
    pub is_required: bool,
    pub is_mandatory: Option<bool>,
    /// Folds one AVP whose code matched this descriptor into `obj`. Called
    /// once per matching AVP, in wire order, so list-typed fields should
    /// push rather than overwrite.
    pub assign: fn(obj: &mut T, avp: &Avp),
    /// Produces the AVP values this field contributes to encoding: empty for
    /// an unset scalar, one value for a set scalar, N values for a list.
    pub generate: fn(obj: &T) -> Vec<AvpValue>,
}

/// Populates `obj`'s catalogue-bound fields from a decoded AVP list.
/// AVPs that don't match any descriptor are appended to `additional` in
/// their original order, mirroring the upstream `additional_avps` tail.
pub fn populate_from_avps<T>(obj: &mut T, catalogue: &[FieldDef<T>], avps: &[Avp], additional: &mut Vec<Avp>) {
    'avp: for avp in avps {
        for def in catalogue {
            if def.avp_code == avp.code && def.vendor_id == avp.vendor_id {
                (def.assign)(obj, avp);
                continue 'avp;
            }
        }
        additional.push(avp.clone());
    }
}

/// Generates an ordered AVP list from `obj`'s catalogue-bound fields,
/// followed by `additional` verbatim.
///
/// `strict` controls what happens when a required field was never set:
/// in strict mode that's an encode error, otherwise the field is silently
/// skipped (matching `generate_avps_from_defs(obj, strict=False)` upstream).
pub fn avps_from_attributes<T>(
    obj: &T,
    catalogue: &[FieldDef<T>],
    additional: &[Avp],
    strict: bool,
) -> Result<Vec<Avp>, AvpEncodeError> {
    let mut out = Vec::new();
    for def in catalogue {
        let values = (def.generate)(obj);
        if values.is_empty() {
            if def.is_required && strict {
                return Err(AvpEncodeError::OutOfRange {
                    avp_code: def.avp_code,
                    reason: format!("required attribute `{}` is not set", def.attr_name),
                });
            }
            continue;
        }
        for value in values {
            out.push(Avp::new(def.avp_code, def.vendor_id, value, def.is_mandatory));
        }
    }
    out.extend(additional.iter().cloned());
    Ok(out)
}
