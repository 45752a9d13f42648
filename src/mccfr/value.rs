/// a numeric cell type storable in shared strategy tables.
///
/// regrets are i32, average-strategy mass is f32, and sampled
/// blueprints pack an action index into a u8. all cell traffic is
/// relaxed: stale regret reads are tolerated by external-sampling
/// MCCFR, and cross-cell ordering comes from the driver's barriers.
pub trait Value: Copy + Default + PartialEq + Send + Sync + 'static {
    type Atomic: Send + Sync;

    fn zero() -> Self::Atomic;
    fn load(cell: &Self::Atomic) -> Self;
    fn store(cell: &Self::Atomic, value: Self);
    fn add(cell: &Self::Atomic, delta: Self);
    /// multiply in place; single-writer phases only
    fn scale(cell: &Self::Atomic, factor: f64);
    fn write<W: Write>(writer: &mut W, value: Self) -> std::io::Result<()>;
    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}

impl Value for i32 {
    type Atomic = AtomicI32;

    fn zero() -> Self::Atomic {
        AtomicI32::new(0)
    }
    fn load(cell: &Self::Atomic) -> Self {
        cell.load(Ordering::Relaxed)
    }
    fn store(cell: &Self::Atomic, value: Self) {
        cell.store(value, Ordering::Relaxed)
    }
    fn add(cell: &Self::Atomic, delta: Self) {
        cell.fetch_add(delta, Ordering::Relaxed);
    }
    fn scale(cell: &Self::Atomic, factor: f64) {
        let old = cell.load(Ordering::Relaxed);
        cell.store((old as f64 * factor) as i32, Ordering::Relaxed);
    }
    fn write<W: Write>(writer: &mut W, value: Self) -> std::io::Result<()> {
        writer.write_i32::<BE>(value)
    }
    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_i32::<BE>()
    }
}

impl Value for f32 {
    type Atomic = AtomicU32;

    fn zero() -> Self::Atomic {
        AtomicU32::new(0f32.to_bits())
    }
    fn load(cell: &Self::Atomic) -> Self {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }
    fn store(cell: &Self::Atomic, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed)
    }
    fn add(cell: &Self::Atomic, delta: Self) {
        let mut old = cell.load(Ordering::Relaxed);
        loop {
            let new = (f32::from_bits(old) + delta).to_bits();
            match cell.compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(seen) => old = seen,
            }
        }
    }
    fn scale(cell: &Self::Atomic, factor: f64) {
        let old = f32::from_bits(cell.load(Ordering::Relaxed));
        cell.store(((old as f64 * factor) as f32).to_bits(), Ordering::Relaxed);
    }
    fn write<W: Write>(writer: &mut W, value: Self) -> std::io::Result<()> {
        writer.write_f32::<BE>(value)
    }
    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_f32::<BE>()
    }
}

impl Value for u8 {
    type Atomic = AtomicU8;

    fn zero() -> Self::Atomic {
        AtomicU8::new(0)
    }
    fn load(cell: &Self::Atomic) -> Self {
        cell.load(Ordering::Relaxed)
    }
    fn store(cell: &Self::Atomic, value: Self) {
        cell.store(value, Ordering::Relaxed)
    }
    fn add(cell: &Self::Atomic, delta: Self) {
        cell.fetch_add(delta, Ordering::Relaxed);
    }
    fn scale(_: &Self::Atomic, _: f64) {
        // sampled cells hold action indices, not magnitudes
    }
    fn write<W: Write>(writer: &mut W, value: Self) -> std::io::Result<()> {
        writer.write_u8(value)
    }
    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_u8()
    }
}

use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use byteorder::BE;
use std::io::Read;
use std::io::Write;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_cas_add() {
        let cell = f32::zero();
        f32::add(&cell, 0.25);
        f32::add(&cell, 0.50);
        assert!(f32::load(&cell) == 0.75);
    }

    #[test]
    fn i32_scale_truncates() {
        let cell = i32::zero();
        i32::store(&cell, 1000);
        i32::scale(&cell, 0.8);
        assert!(i32::load(&cell) == 800);
    }
}
