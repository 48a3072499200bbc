use crate::convert::{format_date, format_time};
use crate::node::{Node, Value};
use sha2::{Digest, Sha256};

/// SHA-256 over a canonical encoding of the whole tree.
pub fn fingerprint(node: &Node) -> [u8; 32] {
    let mut bytes = Vec::new();
    write_node_canonical(&mut bytes, node);

    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    let len = s.len() as u64;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn write_node_canonical(buf: &mut Vec<u8>, node: &Node) {
    write_str(buf, &node.name);
    write_value_canonical(buf, &node.value);
    let len = node.children.len() as u64;
    buf.extend_from_slice(&len.to_be_bytes());
    for child in &node.children {
        write_node_canonical(buf, child);
    }
}

fn write_value_canonical(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(0x00),
        Value::String(v) => {
            buf.push(0x01);
            write_str(buf, v);
        }
        Value::TypedString(v) => {
            buf.push(0x02);
            write_str(buf, v);
        }
        Value::Int(v) => {
            buf.push(0x03);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::UInt(v) => {
            buf.push(0x04);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::Long(v) => {
            buf.push(0x05);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::ULong(v) => {
            buf.push(0x06);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::Short(v) => {
            buf.push(0x07);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::UShort(v) => {
            buf.push(0x08);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::Byte(v) => {
            buf.push(0x09);
            buf.push(*v);
        }
        Value::SByte(v) => {
            buf.push(0x0a);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Value::Float(v) => {
            buf.push(0x0b);
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Value::Double(v) => {
            buf.push(0x0c);
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Value::Decimal(v) => {
            let n = v.normalized();
            buf.push(0x0d);
            buf.extend_from_slice(&n.mantissa().to_be_bytes());
            buf.extend_from_slice(&n.scale().to_be_bytes());
        }
        Value::Bool(v) => {
            buf.push(0x0e);
            buf.push(if *v { 0x01 } else { 0x00 });
        }
        Value::Char(v) => {
            buf.push(0x0f);
            buf.extend_from_slice(&u32::from(*v).to_be_bytes());
        }
        Value::Guid(v) => {
            buf.push(0x10);
            buf.extend_from_slice(v.as_bytes());
        }
        Value::Date(v) => {
            buf.push(0x11);
            write_str(buf, &format_date(v));
        }
        Value::Time(v) => {
            buf.push(0x12);
            write_str(buf, &format_time(*v));
        }
        Value::Path(v) => {
            buf.push(0x13);
            let len = v.0.len() as u64;
            buf.extend_from_slice(&len.to_be_bytes());
            for index in &v.0 {
                buf.extend_from_slice(&(*index as u64).to_be_bytes());
            }
        }
        Value::Blob(v) => {
            buf.push(0x14);
            let len = v.len() as u64;
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(v);
        }
        Value::Node(v) => {
            buf.push(0x15);
            write_node_canonical(buf, v);
        }
        Value::Opaque { kind, text } => {
            buf.push(0x16);
            write_str(buf, kind);
            write_str(buf, text);
        }
    }
}
