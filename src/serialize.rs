//! The serialized state blob: `HEADER | CONTEXT | STATE |
//! SNAPSHOTS | FOOTER`, used for `set_state` round-trips and seals.
//! All big integers cross this boundary as decimal strings.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::io::{self, Cursor, Read, Write};

use crate::accumulator::{Snapshot, SnapshotAccumulator};
use crate::context::{CryptoContext, DEFAULT_PRIME_BITS};
use crate::error::{Result, SighaError};

const MAGIC: &[u8; 6] = b"SIGHA1";
const VERSION: u8 = 1;
const FLAG_DEBUG_RETAIN_FACTORS: u8 = 0x01;

/// Serializes `accumulator`'s `(context, T, depth, snapshots)` into
/// this module's wire format.
pub fn encode_state(accumulator: &SnapshotAccumulator) -> Result<Vec<u8>> {
    let ctx = accumulator.context();
    let mut body = Vec::new();
    write_context(&mut body, ctx)?;
    write_state(&mut body, accumulator.current_t(), accumulator.depth())?;
    write_snapshots(&mut body, accumulator.snapshot_chain())?;

    let mut out = Vec::with_capacity(body.len() + 8 + 64);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    let flags = if ctx.debug_retain_factors() {
        FLAG_DEBUG_RETAIN_FACTORS
    } else {
        0
    };
    out.push(flags);
    out.extend_from_slice(&body);

    let context_digest = ctx.digest();
    let state_digest = compute_state_digest(&context_digest, &body);
    out.extend_from_slice(&context_digest);
    out.extend_from_slice(&state_digest);

    Ok(out)
}

/// Parses a blob produced by `encode_state`, reconstructing a fresh,
/// `ACTIVE` `SnapshotAccumulator`. Validates magic, version, and both
/// footer digests; any mismatch is `Deserialization`.
pub fn decode_state(blob: &[u8]) -> Result<SnapshotAccumulator> {
    if blob.len() < 8 + 64 {
        return Err(SighaError::Deserialization("blob too short".into()));
    }
    let mut cursor = Cursor::new(blob);

    let mut magic = [0u8; 6];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(SighaError::Deserialization("bad magic".into()));
    }
    let version = cursor.read_u8()?;
    if version != VERSION {
        return Err(SighaError::Deserialization(format!(
            "unsupported version {}",
            version
        )));
    }
    let flags = cursor.read_u8()?;

    let body_start = cursor.position() as usize;
    let footer_start = blob
        .len()
        .checked_sub(64)
        .ok_or_else(|| SighaError::Deserialization("blob too short for footer".into()))?;
    if footer_start < body_start {
        return Err(SighaError::Deserialization("blob too short for body".into()));
    }
    let body = &blob[body_start..footer_start];

    let ctx = read_context(&mut cursor, flags)?;
    let (t, depth) = read_state(&mut cursor)?;
    let snapshots = read_snapshots(&mut cursor)?;

    let mut expected_context_digest = [0u8; 32];
    cursor.read_exact(&mut expected_context_digest)?;
    let mut expected_state_digest = [0u8; 32];
    cursor.read_exact(&mut expected_state_digest)?;

    if expected_context_digest != ctx.digest() {
        return Err(SighaError::Deserialization(
            "context_digest mismatch".into(),
        ));
    }
    let actual_state_digest = compute_state_digest(&expected_context_digest, body);
    if actual_state_digest != expected_state_digest {
        return Err(SighaError::Deserialization("state_digest mismatch".into()));
    }

    SnapshotAccumulator::from_raw_parts(ctx, t, depth, snapshots)
}

fn compute_state_digest(context_digest: &[u8; 32], body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"sigha-state-digest-v1");
    hasher.update(context_digest);
    hasher.update(body);
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

fn write_len_prefixed_decimal<W: Write>(w: &mut W, x: &BigUint) -> io::Result<()> {
    let s = crate::bigint::to_decimal(x);
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

fn read_len_prefixed_decimal<R: Read>(r: &mut R) -> Result<BigUint> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let s = String::from_utf8(buf)
        .map_err(|_| SighaError::Deserialization("non-utf8 bigint bytes".into()))?;
    crate::bigint::from_decimal(&s).map_err(|e| SighaError::Deserialization(e.to_string()))
}

fn write_context<W: Write>(w: &mut W, ctx: &CryptoContext) -> Result<()> {
    w.write_u32::<LittleEndian>(ctx.bit_length() as u32)?;
    w.write_u32::<LittleEndian>(ctx.max_depth())?;
    write_len_prefixed_decimal(w, ctx.modulus())?;
    write_len_prefixed_decimal(w, ctx.generator())?;
    write_len_prefixed_decimal(w, ctx.seed())?;
    Ok(())
}

fn read_context<R: Read>(r: &mut R, flags: u8) -> Result<CryptoContext> {
    let bit_length = r.read_u32::<LittleEndian>()? as usize;
    let max_depth = r.read_u32::<LittleEndian>()?;
    let m = read_len_prefixed_decimal(r)?;
    let g = read_len_prefixed_decimal(r)?;
    let t0 = read_len_prefixed_decimal(r)?;

    // `prime_bits` is not carried on the wire (the CONTEXT
    // section has no field for it); reconstructed contexts use the
    // crate default, documented in DESIGN.md.
    let ctx = CryptoContext::from_parts(bit_length, max_depth, DEFAULT_PRIME_BITS, m, g, t0)?;
    let ctx = ctx.with_debug_retain_factors(flags & FLAG_DEBUG_RETAIN_FACTORS != 0);
    Ok(ctx)
}

fn write_state<W: Write>(w: &mut W, t: &BigUint, depth: u32) -> Result<()> {
    write_len_prefixed_decimal(w, t)?;
    w.write_u32::<LittleEndian>(depth)?;
    Ok(())
}

fn read_state<R: Read>(r: &mut R) -> Result<(BigUint, u32)> {
    let t = read_len_prefixed_decimal(r)?;
    let depth = r.read_u32::<LittleEndian>()?;
    Ok((t, depth))
}

fn write_snapshots<W: Write>(w: &mut W, snapshots: &[Snapshot]) -> Result<()> {
    w.write_u32::<LittleEndian>(snapshots.len() as u32)?;
    for snap in snapshots {
        write_len_prefixed_decimal(w, &snap.t_folded)?;
        w.write_u32::<LittleEndian>(snap.depth_at_fold)?;
        w.write_all(&snap.fold_seed)?;
    }
    Ok(())
}

fn read_snapshots<R: Read>(r: &mut R) -> Result<Vec<Snapshot>> {
    let count = r.read_u32::<LittleEndian>()?;
    let mut snapshots = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let t_folded = read_len_prefixed_decimal(r)?;
        let depth_at_fold = r.read_u32::<LittleEndian>()?;
        let mut fold_seed = [0u8; 32];
        r.read_exact(&mut fold_seed)?;
        snapshots.push(Snapshot {
            t_folded,
            depth_at_fold,
            fold_seed,
        });
    }
    Ok(snapshots)
}
