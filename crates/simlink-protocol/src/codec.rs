//! f64 数组编解码
//!
//! 每个值写为 8 字节小端 IEEE-754 位模式，按输入顺序拼接。
//! 解码按 `len >> 3` 计算个数，尾部不足 8 字节的余数直接丢弃。

use crate::ProtocolError;
use crate::constants::{F64_WIRE_SIZE, encoded_len};
use bytes::{Buf, BufMut, BytesMut};

/// 编码 f64 数组为字节序列
///
/// 输出长度恒为 `8 * values.len()`，空输入得到空输出。
///
/// # Example
///
/// ```
/// use simlink_protocol::encode;
///
/// let bytes = encode(&[0.6, 0.6, 0.6, 0.6]);
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn encode(values: &[f64]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(encoded_len(values.len()));
    encode_into(values, &mut buf);
    buf.to_vec()
}

/// 编码到已有缓冲区（追加写入）
///
/// 用于 IO 循环中复用缓冲区，避免每次迭代分配。
pub fn encode_into(values: &[f64], buf: &mut BytesMut) {
    buf.reserve(encoded_len(values.len()));
    for &value in values {
        buf.put_f64_le(value);
    }
}

/// 解码字节序列为 f64 数组
///
/// 长度不是 8 的倍数时只处理最长的 8 字节对齐前缀，永不失败。
///
/// # Example
///
/// ```
/// use simlink_protocol::{decode, encode};
///
/// let mut bytes = encode(&[3.14]);
/// bytes.push(0xAA); // 多余的尾字节被忽略
/// assert_eq!(decode(&bytes), vec![3.14]);
/// ```
pub fn decode(bytes: &[u8]) -> Vec<f64> {
    let count = bytes.len() >> 3;
    let mut data = &bytes[..encoded_len(count)];
    let mut values = Vec::with_capacity(count);
    while data.remaining() >= F64_WIRE_SIZE {
        values.push(data.get_f64_le());
    }
    values
}

/// 严格解码：长度必须恰好等于 `8 * expected_count`
///
/// # Errors
/// - `ProtocolError::InvalidLength`: 长度不匹配
pub fn decode_exact(bytes: &[u8], expected_count: usize) -> Result<Vec<f64>, ProtocolError> {
    let expected = encoded_len(expected_count);
    if bytes.len() != expected {
        return Err(ProtocolError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(decode(bytes))
}
