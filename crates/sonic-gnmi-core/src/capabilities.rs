//! `Capabilities` data (spec §6: "Capabilities advertises a single
//! `sonic-db` model"). The external gRPC `Capabilities` handler is out of
//! scope here; this module gives it the constant data to return.

/// One YANG/schema model a `Capabilities` response can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelData {
    pub name: &'static str,
    pub organization: &'static str,
    pub version: &'static str,
}

/// gNMI's `Encoding` enum, mirrored without a `prost`/`tonic` dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    JsonIetf,
    Proto,
}

const SONIC_DB_MODEL: ModelData = ModelData {
    name: "sonic-db",
    organization: "SONiC",
    version: "0.1.0",
};

/// The single model this data-access layer advertises.
pub fn supported_models() -> Vec<ModelData> {
    vec![SONIC_DB_MODEL]
}

/// `JSON_IETF` is the value codec's only wire form; `PROTO` passes through
/// opaque bytes the caller already encoded (spec §4.4, §6).
pub fn supported_encodings() -> Vec<Encoding> {
    vec![Encoding::JsonIetf, Encoding::Proto]
}
