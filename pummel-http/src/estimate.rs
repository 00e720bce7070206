/// Estimate the serialized size of a header block.
///
/// Every field counts as an HTTP/1.1 line (`name: value\r\n`) and the block is closed by an
/// empty line. The status line is not included.
pub fn estimate_header_bytes(headers: &http::HeaderMap) -> u64 {
    let mut bytes = 0u64;
    for (name, value) in headers.iter() {
        bytes = bytes.saturating_add(estimate_http1_header_bytes(
            name.as_str().as_bytes(),
            value.as_bytes(),
        ));
    }
    bytes.saturating_add(2)
}

fn estimate_http1_header_bytes(name: &[u8], value: &[u8]) -> u64 {
    // "name: value\r\n"
    (name.len() as u64)
        .saturating_add(2)
        .saturating_add(value.len() as u64)
        .saturating_add(2)
}
