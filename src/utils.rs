use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

// Unformatted record helpers: [len:u32] payload [len:u32], little endian.
pub fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record larger than 4 GiB"))?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(payload)?;
    w.write_u32::<LittleEndian>(len)?;
    Ok(())
}

pub fn read_record<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let len2 = r.read_u32::<LittleEndian>()? as usize;
    if len != len2 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "record length mismatch"));
    }
    Ok(buf)
}

pub fn encode_u64s(v: &[u64]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 8];
    LittleEndian::write_u64_into(v, &mut out);
    out
}

pub fn decode_u64s(buf: &[u8]) -> io::Result<Vec<u64>> {
    if buf.len() % 8 != 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "payload is not a u64 array"));
    }
    let mut out = vec![0u64; buf.len() / 8];
    LittleEndian::read_u64_into(buf, &mut out);
    Ok(out)
}

pub fn encode_f64s(v: &[f64]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 8];
    LittleEndian::write_f64_into(v, &mut out);
    out
}

pub fn decode_f64s(buf: &[u8]) -> io::Result<Vec<f64>> {
    if buf.len() % 8 != 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "payload is not a f64 array"));
    }
    let mut out = vec![0f64; buf.len() / 8];
    LittleEndian::read_f64_into(buf, &mut out);
    Ok(out)
}

pub fn encode_pairs(pairs: &[(u64, u64)]) -> Vec<u8> {
    let flat: Vec<u64> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
    encode_u64s(&flat)
}

pub fn decode_pairs(buf: &[u8]) -> io::Result<Vec<(u64, u64)>> {
    let flat = decode_u64s(buf)?;
    if flat.len() % 2 != 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "odd number of pair entries"));
    }
    Ok(flat.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}
