//! Revert Decoder
//!
//! Turns a failed remote call into one readable line. The payload is located
//! by probing a fixed list of locations in the error body, then handed to an
//! ordered chain of decoders; the first one that understands it wins. When no
//! payload decodes, the human-readable fields of the error are used instead.

use ethers::abi::{self, Abi, ParamType, Token};
use ethers::types::I256;
use ethers::utils::to_checksum;
use swap_chain::RemoteError;
use tracing::debug;

/// Locations of the raw revert payload, probed in order
pub const REVERT_DATA_PATHS: &[&str] = &[
    "/data",
    "/error/data",
    "/info/error/data",
    "/info/data",
    "/cause/data",
    "/error/data/data",
];

/// Human-readable fields, probed in order once no payload decodes
pub const MESSAGE_PATHS: &[&str] = &["/shortMessage", "/reason", "/message"];

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// `Error(string)`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// `Panic(uint256)`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// One way of reading a revert payload
trait PayloadDecoder: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Option<String>;
}

/// Custom error declared by the contract
#[derive(Debug, Clone, PartialEq)]
pub struct CustomError {
    pub name: String,
    pub params: Vec<ParamType>,
    selector: [u8; 4],
}

impl CustomError {
    pub fn new(name: impl Into<String>, params: Vec<ParamType>) -> Self {
        let name = name.into();
        let selector = abi::short_signature(&name, &params);
        Self {
            name,
            params,
            selector,
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }
}

impl From<&abi::ethabi::AbiError> for CustomError {
    fn from(error: &abi::ethabi::AbiError) -> Self {
        let params = error.inputs.iter().map(|param| param.kind.clone()).collect();
        Self::new(error.name.clone(), params)
    }
}

/// Errors the ResourceSwap contract inherits from the ERC-721 and Ownable bases
pub fn resource_swap_errors() -> Vec<CustomError> {
    use ParamType::{Address, Uint};

    vec![
        CustomError::new("ERC721InvalidOwner", vec![Address]),
        CustomError::new("ERC721NonexistentToken", vec![Uint(256)]),
        CustomError::new("ERC721IncorrectOwner", vec![Address, Uint(256), Address]),
        CustomError::new("ERC721InvalidSender", vec![Address]),
        CustomError::new("ERC721InvalidReceiver", vec![Address]),
        CustomError::new("ERC721InsufficientApproval", vec![Address, Uint(256)]),
        CustomError::new("ERC721InvalidApprover", vec![Address]),
        CustomError::new("ERC721InvalidOperator", vec![Address]),
        CustomError::new("OwnableUnauthorizedAccount", vec![Address]),
        CustomError::new("OwnableInvalidOwner", vec![Address]),
    ]
}

struct CustomErrors(Vec<CustomError>);

impl PayloadDecoder for CustomErrors {
    fn decode(&self, payload: &[u8]) -> Option<String> {
        let (selector, args) = split_selector(payload)?;
        self.0
            .iter()
            .filter(|error| error.selector == selector)
            .find_map(|error| {
                let tokens = abi::decode(&error.params, args).ok()?;
                let rendered: Vec<String> = tokens.iter().map(render_token).collect();
                Some(format!("Revert: {}({})", error.name, rendered.join(", ")))
            })
    }
}

struct ErrorString;

impl PayloadDecoder for ErrorString {
    fn decode(&self, payload: &[u8]) -> Option<String> {
        let (selector, args) = split_selector(payload)?;
        if selector != ERROR_STRING_SELECTOR {
            return None;
        }
        match abi::decode(&[ParamType::String], args).ok()?.pop()? {
            Token::String(reason) => Some(format!("Revert: {reason}")),
            _ => None,
        }
    }
}

struct Panic;

impl PayloadDecoder for Panic {
    fn decode(&self, payload: &[u8]) -> Option<String> {
        let (selector, args) = split_selector(payload)?;
        if selector != PANIC_SELECTOR {
            return None;
        }
        match abi::decode(&[ParamType::Uint(256)], args).ok()?.pop()? {
            Token::Uint(code) => Some(format!("Revert: Panic({code:#x})")),
            _ => None,
        }
    }
}

fn split_selector(payload: &[u8]) -> Option<([u8; 4], &[u8])> {
    if payload.len() < 4 {
        return None;
    }
    let (head, rest) = payload.split_at(4);
    Some((head.try_into().ok()?, rest))
}

/// Stringify a decoded argument
pub fn render_token(token: &Token) -> String {
    match token {
        Token::Address(address) => to_checksum(address, None),
        Token::Uint(value) => value.to_string(),
        Token::Int(value) => I256::from_raw(*value).to_string(),
        Token::Bool(value) => value.to_string(),
        Token::String(value) => value.clone(),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(render_token).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

/// Raw revert payload of the error, if any location holds one
pub fn revert_payload(err: &RemoteError) -> Option<Vec<u8>> {
    let data = REVERT_DATA_PATHS
        .iter()
        .filter_map(|pointer| err.str_at(pointer))
        .find(|data| data.len() > 2 && data.starts_with("0x"))?;
    hex::decode(&data[2..]).ok()
}

/// Decodes failed calls into diagnosis strings
pub struct RevertDecoder {
    decoders: Vec<Box<dyn PayloadDecoder>>,
}

impl Default for RevertDecoder {
    fn default() -> Self {
        Self::new(resource_swap_errors())
    }
}

impl RevertDecoder {
    /// Decoder for the given custom errors plus the standard encodings
    pub fn new(errors: Vec<CustomError>) -> Self {
        Self {
            decoders: vec![
                Box::new(CustomErrors(errors)),
                Box::new(ErrorString),
                Box::new(Panic),
            ],
        }
    }

    /// Built-in errors extended with those declared in a contract ABI
    pub fn with_abi(abi: &Abi) -> Self {
        let mut errors = resource_swap_errors();
        for declared in abi.errors.values().flatten() {
            let error = CustomError::from(declared);
            if !errors.contains(&error) {
                errors.push(error);
            }
        }
        Self::new(errors)
    }

    /// Decode a raw revert payload
    pub fn decode_payload(&self, payload: &[u8]) -> Option<String> {
        self.decoders
            .iter()
            .find_map(|decoder| decoder.decode(payload))
    }

    /// Diagnose a failed call. Always returns a non-empty string.
    pub fn decode(&self, err: &RemoteError) -> String {
        if let Some(diagnosis) = revert_payload(err).and_then(|payload| self.decode_payload(&payload)) {
            return diagnosis;
        }
        debug!("No decodable revert payload in {}", err.body());

        MESSAGE_PATHS
            .iter()
            .filter_map(|pointer| err.str_at(pointer))
            .find(|message| !message.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn error_string_payload(reason: &str) -> Vec<u8> {
        let mut payload = ERROR_STRING_SELECTOR.to_vec();
        payload.extend(abi::encode(&[Token::String(reason.to_string())]));
        payload
    }

    fn hex0x(payload: &[u8]) -> String {
        format!("0x{}", hex::encode(payload))
    }

    #[test]
    fn test_error_string_reason() {
        let decoder = RevertDecoder::default();
        let err = RemoteError::from_revert_data(&error_string_payload("Not owner"));
        assert_eq!(decoder.decode(&err), "Revert: Not owner");
    }

    #[test]
    fn test_custom_error_arguments_in_order() {
        let decoder = RevertDecoder::default();
        let sender = Address::repeat_byte(0xaa);
        let owner = Address::repeat_byte(0xbb);

        let error = CustomError::new(
            "ERC721IncorrectOwner",
            vec![ParamType::Address, ParamType::Uint(256), ParamType::Address],
        );
        let mut payload = error.selector().to_vec();
        payload.extend(abi::encode(&[
            Token::Address(sender),
            Token::Uint(U256::from(42u64)),
            Token::Address(owner),
        ]));

        let err = RemoteError::from_revert_data(&payload);
        assert_eq!(
            decoder.decode(&err),
            format!(
                "Revert: ERC721IncorrectOwner({}, 42, {})",
                to_checksum(&sender, None),
                to_checksum(&owner, None)
            )
        );
    }

    #[test]
    fn test_custom_error_without_arguments() {
        let decoder = RevertDecoder::new(vec![CustomError::new("OfferInactive", vec![])]);
        let payload = abi::short_signature("OfferInactive", &[]).to_vec();
        let err = RemoteError::from_revert_data(&payload);
        assert_eq!(decoder.decode(&err), "Revert: OfferInactive()");
    }

    #[test]
    fn test_errors_from_abi() {
        let abi: Abi = serde_json::from_value(json!([{
            "type": "error",
            "name": "CooldownActive",
            "inputs": [{ "name": "remaining", "type": "uint256", "internalType": "uint256" }]
        }]))
        .unwrap();
        let decoder = RevertDecoder::with_abi(&abi);

        let mut payload = abi::short_signature("CooldownActive", &[ParamType::Uint(256)]).to_vec();
        payload.extend(abi::encode(&[Token::Uint(U256::from(90u64))]));

        let err = RemoteError::from_revert_data(&payload);
        assert_eq!(decoder.decode(&err), "Revert: CooldownActive(90)");

        let declared = CustomError::from(&abi.errors["CooldownActive"][0]);
        assert_eq!(declared.params, vec![ParamType::Uint(256)]);
        assert_eq!(
            declared.selector(),
            abi::short_signature("CooldownActive", &[ParamType::Uint(256)])
        );
    }

    #[test]
    fn test_panic_code() {
        let decoder = RevertDecoder::default();
        let mut payload = PANIC_SELECTOR.to_vec();
        payload.extend(abi::encode(&[Token::Uint(U256::from(0x11u64))]));

        let err = RemoteError::from_revert_data(&payload);
        assert_eq!(decoder.decode(&err), "Revert: Panic(0x11)");
    }

    #[test]
    fn test_payload_nested_in_wrappers() {
        let decoder = RevertDecoder::default();
        let data = hex0x(&error_string_payload("Cooldown"));

        let shapes = [
            json!({ "error": { "data": data } }),
            json!({ "info": { "error": { "data": data } } }),
            json!({ "info": { "data": data } }),
            json!({ "cause": { "data": data } }),
            json!({ "error": { "code": 3, "data": { "data": data } } }),
        ];
        for shape in shapes {
            let err = RemoteError::from_json(shape.clone());
            assert_eq!(decoder.decode(&err), "Revert: Cooldown", "shape {shape}");
        }
    }

    #[test]
    fn test_first_location_wins() {
        let decoder = RevertDecoder::default();
        let err = RemoteError::from_json(json!({
            "data": hex0x(&error_string_payload("outer")),
            "error": { "data": hex0x(&error_string_payload("inner")) },
        }));
        assert_eq!(decoder.decode(&err), "Revert: outer");
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        let decoder = RevertDecoder::default();
        let err = RemoteError::from_json(json!({
            "data": "0x",
            "error": { "data": hex0x(&error_string_payload("inner")) },
        }));
        assert_eq!(decoder.decode(&err), "Revert: inner");
    }

    #[test]
    fn test_message_fallback_order() {
        let decoder = RevertDecoder::default();

        let err = RemoteError::from_json(json!({
            "data": "0xdeadbeef",
            "shortMessage": "short",
            "reason": "reason",
            "message": "long message",
        }));
        assert_eq!(decoder.decode(&err), "short");

        let err = RemoteError::from_json(json!({ "reason": "reason", "message": "long" }));
        assert_eq!(decoder.decode(&err), "reason");

        let err = RemoteError::from_json(json!({ "data": "0xzz", "message": "long" }));
        assert_eq!(decoder.decode(&err), "long");
    }

    #[test]
    fn test_unknown_error_sentinel() {
        let decoder = RevertDecoder::default();
        for body in [Value::Null, json!({}), json!([]), json!({ "data": 5, "message": "" })] {
            assert_eq!(decoder.decode(&RemoteError::from_json(body)), UNKNOWN_ERROR);
        }
    }

    #[test]
    fn test_render_tokens() {
        assert_eq!(render_token(&Token::Bool(true)), "true");
        assert_eq!(render_token(&Token::Bytes(vec![0xca, 0xfe])), "0xcafe");
        assert_eq!(
            render_token(&Token::Int(I256::from(-5i64).into_raw())),
            "-5"
        );
        assert_eq!(
            render_token(&Token::Array(vec![
                Token::Uint(U256::from(1u64)),
                Token::Uint(U256::from(2u64))
            ])),
            "[1, 2]"
        );
    }

    proptest! {
        #[test]
        fn test_decode_never_empty(payload in prop::collection::vec(any::<u8>(), 0..200), message in ".*") {
            let decoder = RevertDecoder::default();
            let err = RemoteError::from_json(json!({
                "data": hex0x(&payload),
                "message": message,
            }));
            prop_assert!(!decoder.decode(&err).is_empty());
        }

        #[test]
        fn test_error_string_round_trip(reason in "[a-zA-Z0-9 ]{1,64}") {
            let decoder = RevertDecoder::default();
            let err = RemoteError::from_revert_data(&error_string_payload(&reason));
            prop_assert_eq!(decoder.decode(&err), format!("Revert: {}", reason));
        }
    }
}
