//! Call data parsing: `function@hexArg1@hexArg2...`.

use causeway_primitives::{ChainError, ChainResult};

const ARG_SEPARATOR: u8 = b'@';

/// Split call data into the function name and its decoded arguments.
///
/// The function must be non-empty UTF-8; every argument must be valid hex
/// (an empty argument decodes to an empty byte string).
pub fn parse_call_data(data: &[u8]) -> ChainResult<(String, Vec<Vec<u8>>)> {
    if data.is_empty() {
        return Err(ChainError::InvalidCallData("empty data".into()));
    }

    let mut tokens = data.split(|b| *b == ARG_SEPARATOR);
    let function = tokens.next().unwrap_or_default();
    if function.is_empty() {
        return Err(ChainError::InvalidCallData("missing function".into()));
    }
    let function = std::str::from_utf8(function)
        .map_err(|_| ChainError::InvalidCallData("function is not utf-8".into()))?
        .to_string();

    let arguments = tokens
        .enumerate()
        .map(|(i, token)| {
            hex::decode(token)
                .map_err(|e| ChainError::InvalidCallData(format!("argument {i}: {e}")))
        })
        .collect::<ChainResult<Vec<_>>>()?;

    Ok((function, arguments))
}

/// Build call data from a function and raw arguments.
pub fn build_call_data(function: &str, arguments: &[Vec<u8>]) -> Vec<u8> {
    let mut data = function.as_bytes().to_vec();
    for arg in arguments {
        data.push(ARG_SEPARATOR);
        data.extend_from_slice(hex::encode(arg).as_bytes());
    }
    data
}
