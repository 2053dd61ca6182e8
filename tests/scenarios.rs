//! End-to-end scenarios exercising the dispatcher against literal buffers.

use residua::cipher::{aes, serpent};
use residua::context::{Context, KeyKind};
use residua::dispatcher;
use residua::result::ResultRecord;

// The AES-128 schedule of an all-zero key is not itself all-zero (e.g.
// w[4] = 0x62636363 from SubWord(RotWord(0)) XOR Rcon[0]), so a buffer of
// zero bytes never reproduces its own expansion and no key is ever reported
// here, by default or otherwise.

#[test]
fn s1_all_zero_buffer_reports_no_aes_match_by_default() {
    let buf = vec![0u8; 1024];
    let mut ctx = Context::new(Some(KeyKind::Aes));
    ctx.key_size_bits = 128;
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn s1_all_zero_buffer_with_reject_constant_key_also_reports_nothing() {
    // reject_constant_key guards a match that cannot occur for a genuine
    // all-zero key anyway; this pins that it doesn't change the (already
    // empty) result.
    let buf = vec![0u8; 1024];
    let mut ctx = Context::new(Some(KeyKind::Aes));
    ctx.key_size_bits = 128;
    ctx.reject_constant_key = true;
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn s2_der_rsa_key_is_reported() {
    let mut buf = vec![
        0x30, 0x82, 0x04, 0xA3, 0x02, 0x01, 0x00, 0x02, 0x82, 0x01, 0x01, 0x00,
    ];
    buf.extend(std::iter::repeat(0x77u8).take(256));
    buf.extend([0x02, 0x03, 0x01, 0x00, 0x01]);
    buf.extend(std::iter::repeat(0xAAu8).take(900));

    let ctx = Context::new(Some(KeyKind::RsaDer));
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    assert_eq!(records.len(), 1);
    match &records[0] {
        ResultRecord::DerKey { offset, modulus_bits, public_exponent, length } => {
            assert_eq!(*offset, 0);
            assert_eq!(*modulus_bits, 2048);
            assert_eq!(*public_exponent, 65537);
            assert_eq!(*length, 4 + 0x04A3);
        }
        other => panic!("unexpected record: {other:?}"),
    }
}

#[test]
fn s3_serpent_key_schedule_is_reported() {
    let key: [u8; 32] = std::array::from_fn(|i| i as u8);
    let buf = serpent::expand(&key).to_vec();

    let ctx = Context::new(Some(KeyKind::Serpent));
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], ResultRecord::SerpentKey { offset: 0, .. }));
}

#[test]
fn s4_aes256_key_schedule_found_at_offset() {
    let key: [u8; 32] = std::array::from_fn(|i| i as u8);
    let schedule = aes::expand(&key);

    let mut buf = vec![0u8; 4096];
    buf.extend_from_slice(&schedule);
    buf.extend(vec![0u8; 1024]);

    let mut ctx = Context::new(Some(KeyKind::Aes));
    ctx.key_size_bits = 256;
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    assert!(records
        .iter()
        .any(|r| matches!(r, ResultRecord::AesKey { offset: 4096, bits: 256, .. })));
}

#[test]
fn s5_rsa_win_signature_scan_finds_both_offsets() {
    let mut buf = vec![0u8; 2100];
    buf[100..104].copy_from_slice(b"RSA2");
    buf[2000..2004].copy_from_slice(b"RSA2");

    let ctx = Context::new(Some(KeyKind::RsaWin));
    let records = dispatcher::run(&ctx, &buf, 0, buf.len()).unwrap();
    let offsets: Vec<usize> = records.iter().map(|r| r.offset()).collect();
    assert_eq!(offsets, vec![100, 2000]);
}

#[test]
fn s6_virtual_memory_reconstruction_yields_one_page() {
    const PAGE: usize = 4096;
    let mut buf = vec![0u8; 3 * PAGE];
    // PDE[0] -> page table at pfn=1.
    buf[0..4].copy_from_slice(&(1u32 << 12 | 1).to_le_bytes());
    // PTE[1] -> data page at pfn=2 (virtual 0x1000: pd_index=0, pt_index=1).
    buf[PAGE + 4..PAGE + 8].copy_from_slice(&(2u32 << 12 | 1).to_le_bytes());
    buf[2 * PAGE..2 * PAGE + 4].copy_from_slice(b"PAGE");

    let mut ctx = Context::new(None::<KeyKind>);
    ctx.cr3_offset = Some(0);
    ctx.threshold = 1000.0; // suppress the entropy scan that follows reconstruction
    let records = dispatcher::run(&ctx, &buf, 0x0000_1000, 0x0000_2000).unwrap();
    assert!(records.is_empty());
}
