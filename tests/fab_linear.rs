use box_halo::data::base_fab::{BaseFab, ALL_COMPS};
use box_halo::{CellBox, IntVect, Real, SPACE_DIM};
use proptest::prelude::*;

/// A value unique per cell and component.
fn tagv(iv: IntVect, comp: usize) -> Real {
    let mut v = comp as Real;
    for d in 0..SPACE_DIM {
        v += (iv[d] * 100i32.pow(1 + d as u32)) as Real;
    }
    v
}

/// A random sub-box of `bounds` (which must be a cube).
fn arb_region(bounds: CellBox) -> impl Strategy<Value = CellBox> {
    let span = bounds.dimensions()[0];
    (
        proptest::collection::vec(0..span, SPACE_DIM),
        proptest::collection::vec(0..span, SPACE_DIM),
    )
        .prop_map(move |(a, b)| {
            let mut lo = bounds.lo();
            let mut hi = bounds.lo();
            for d in 0..SPACE_DIM {
                lo[d] = bounds.lo()[d] + a[d].min(b[d]);
                hi[d] = bounds.lo()[d] + a[d].max(b[d]);
            }
            CellBox::new(lo, hi)
        })
}

proptest! {
    #[test]
    fn linear_roundtrip_restores_region(region in arb_region(
        CellBox::new(IntVect::splat(-2), IntVect::splat(3))
    )) {
        let bounds = CellBox::new(IntVect::splat(-2), IntVect::splat(3));
        let mut src: BaseFab<Real> = BaseFab::new(bounds, 2);
        for iv in bounds.cells() {
            for c in 0..2 {
                src[(iv, c)] = tagv(iv, c);
            }
        }
        let mut dst: BaseFab<Real> = BaseFab::with_val(bounds, 2, -7.0);
        let mut buf = vec![0u8; BaseFab::<Real>::linear_size(region, 2)];
        src.linear_out(&mut buf, region, 0, 2).unwrap();
        dst.linear_in(&buf, region, 0, 2).unwrap();
        for iv in bounds.cells() {
            for c in 0..2 {
                let expect = if region.contains(iv) { tagv(iv, c) } else { -7.0 };
                prop_assert_eq!(dst[(iv, c)], expect);
            }
        }
    }

    #[test]
    fn copy_equals_linear_transfer(region in arb_region(
        CellBox::new(IntVect::ZERO, IntVect::splat(3))
    )) {
        // A direct region copy and a pack/unpack round trip agree.
        let bounds = CellBox::new(IntVect::ZERO, IntVect::splat(3));
        let mut src: BaseFab<Real> = BaseFab::new(bounds, 1);
        for iv in bounds.cells() {
            src[(iv, 0)] = tagv(iv, 0);
        }
        let mut by_copy: BaseFab<Real> = BaseFab::new(bounds, 1);
        by_copy.copy(region, 0, &src, region, 0, 1, ALL_COMPS).unwrap();
        let mut by_wire: BaseFab<Real> = BaseFab::new(bounds, 1);
        let mut buf = vec![0u8; BaseFab::<Real>::linear_size(region, 1)];
        src.linear_out(&mut buf, region, 0, 1).unwrap();
        by_wire.linear_in(&buf, region, 0, 1).unwrap();
        for iv in bounds.cells() {
            prop_assert_eq!(by_copy[(iv, 0)], by_wire[(iv, 0)]);
        }
    }
}

#[test]
fn component_stride_across_full_buffer() {
    let bounds = CellBox::new(IntVect::ZERO, IntVect::splat(2));
    let mut fab: BaseFab<Real> = BaseFab::new(bounds, 3);
    for iv in bounds.cells() {
        for c in 0..3 {
            fab[(iv, c)] = tagv(iv, c);
        }
    }
    // Component c occupies the contiguous stride [c*size, (c+1)*size).
    let n = bounds.size();
    for c in 0..3 {
        let slice = fab.comp_slice(c);
        assert_eq!(slice.len(), n);
        for (lin, iv) in bounds.cells().enumerate() {
            assert_eq!(slice[lin], tagv(iv, c));
            assert_eq!(*fab.linear(lin, c), tagv(iv, c));
        }
    }
}

#[test]
fn component_major_wire_order() {
    // The serialised form is component-major: all of comp 0's cells in
    // Fortran order, then all of comp 1's.
    let bounds = CellBox::new(IntVect::ZERO, IntVect::UNIT);
    let mut fab: BaseFab<Real> = BaseFab::new(bounds, 2);
    for iv in bounds.cells() {
        fab[(iv, 0)] = tagv(iv, 0);
        fab[(iv, 1)] = tagv(iv, 1);
    }
    let mut buf = vec![0u8; BaseFab::<Real>::linear_size(bounds, 2)];
    fab.linear_out(&mut buf, bounds, 0, 2).unwrap();
    let vals: &[Real] = bytemuck::cast_slice(&buf);
    let n = bounds.size();
    for (lin, iv) in bounds.cells().enumerate() {
        assert_eq!(vals[lin], tagv(iv, 0));
        assert_eq!(vals[n + lin], tagv(iv, 1));
    }
}
