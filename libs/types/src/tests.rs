use super::*;

#[test]
fn block_number_arithmetic() {
    assert_eq!(BlockNumber(5).next(), BlockNumber(6));
    assert_eq!(BlockNumber(5) + 3, BlockNumber(8));
    assert_eq!(BlockNumber(5).prev(), Some(BlockNumber(4)));
    assert_eq!(BlockNumber(0).prev(), None);
}

#[test]
fn peer_id_text() {
    let peer = PeerId([0x11; 20]);
    assert_eq!(peer.to_string(), format!("peer:{}", "11".repeat(20)));
    assert_eq!(format!("{peer:?}"), peer.to_string());
}
