use std::collections::HashMap;

/// Shannon entropy in bits/byte over the raw bytes of a token.
///
/// `H = -sum(p_i * log2(p_i))` where `p_i` is the frequency of each distinct
/// byte value. Operates on bytes, not chars, so it is meaningful for tokens
/// that are not valid UTF-8 on their own (base64 alphabets always are, but
/// this keeps the contract honest for arbitrary slices).
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq: HashMap<u8, usize> = HashMap::new();
    for &b in data {
        *freq.entry(b).or_insert(0usize) += 1;
    }
    let len = data.len() as f64;
    let mut ent = 0f64;
    for &count in freq.values() {
        let p = (count as f64) / len;
        ent -= p * p.log2();
    }
    ent
}
