//! Ethernet frame check sequence

/// CRC-32 (IEEE 802.3, reflected polynomial 0x04C11DB7) over `data`
pub fn fcs(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// True if the last four bytes of `frame` are the little-endian FCS of the rest
pub fn fcs_matches(frame: &[u8]) -> bool {
    if frame.len() < 4 {
        return false;
    }
    let (body, trailer) = frame.split_at(frame.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    fcs(body) == stored
}
