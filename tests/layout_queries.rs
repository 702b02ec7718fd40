use box_halo::debug_invariants::DebugInvariants;
use box_halo::{
    BoxHaloError, CellBox, DisjointBoxLayout, IntVect, NoComm, Periodic, Trim, SPACE_DIM,
};

fn cube(lo: i32, hi: i32) -> CellBox {
    CellBox::new(IntVect::splat(lo), IntVect::splat(hi))
}

#[test]
fn even_partition_accepted_uneven_rejected() {
    // [0..9]^D into 5^D boxes: two per dimension.
    let dbl = DisjointBoxLayout::new(cube(0, 9), IntVect::splat(5), &NoComm).unwrap();
    assert_eq!(dbl.num_boxes(), 2usize.pow(SPACE_DIM as u32));
    // [0..8]^D does not divide by 5.
    assert!(matches!(
        DisjointBoxLayout::new(cube(0, 8), IntVect::splat(5), &NoComm),
        Err(BoxHaloError::UnevenPartition { .. })
    ));
}

#[test]
fn partition_covers_domain_exactly_once() {
    let domain = cube(-4, 7);
    let dbl = DisjointBoxLayout::new(domain, IntVect::splat(4), &NoComm).unwrap();
    dbl.debug_assert_invariants();
    // Every domain cell is in exactly one box.
    let boxes: Vec<_> = (0..dbl.num_boxes()).map(|k| dbl.entry(k).bounds).collect();
    for iv in domain.cells() {
        let owners = boxes.iter().filter(|b| b.contains(iv)).count();
        assert_eq!(owners, 1, "cell {iv} covered {owners} times");
    }
    // And no box sticks out of the domain.
    for b in &boxes {
        assert!(domain.contains_box(b));
    }
}

#[test]
fn iterators_agree_with_ownership() {
    let dbl = DisjointBoxLayout::with_ranks(cube(0, 9), IntVect::splat(5), 1, 2).unwrap();
    let all: Vec<_> = dbl.iter_all().collect();
    assert_eq!(all.len(), dbl.num_boxes());
    let local: Vec<_> = dbl.iter_local().collect();
    assert_eq!(local.len(), dbl.local_size());
    for bidx in &local {
        assert!(bidx.is_local());
        assert_eq!(dbl.owner(*bidx), 1);
    }
    // Locals are the tail block of the global enumeration.
    assert_eq!(local[0].global(), dbl.local_begin());
    assert_eq!(
        local.last().unwrap().global() + 1,
        dbl.local_end()
    );
}

#[test]
fn neighbor_completeness_full_stencil() {
    // 4 boxes per dimension: interior boxes see the whole 3^D - 1 stencil.
    let dbl = DisjointBoxLayout::new(cube(0, 7), IntVect::splat(2), &NoComm).unwrap();
    let full = 3usize.pow(SPACE_DIM as u32) - 1;
    let nb = dbl.box_dimensions();
    for bidx in dbl.iter_all() {
        let lattice = dbl.lattice_coords(bidx.global());
        let interior =
            (0..SPACE_DIM).all(|d| lattice[d] > 0 && lattice[d] < nb[d] - 1);
        let count = dbl.neighbors(bidx, Trim::NONE).count();
        if interior {
            assert_eq!(count, full);
        } else {
            assert!(count < full);
        }
        // Every neighbour is a distinct box, adjacent on the lattice.
        let mut seen = std::collections::HashSet::new();
        for n in dbl.neighbors(bidx, Trim::NONE) {
            assert!(seen.insert(n.bidx.global()));
            assert_ne!(n.bidx.global(), bidx.global());
            let nl = dbl.lattice_coords(n.bidx.global());
            for d in 0..SPACE_DIM {
                assert!((nl[d] - lattice[d]).abs() <= 1);
                assert_eq!(nl[d] - lattice[d], n.dir[d]);
            }
        }
    }
}

#[test]
fn trimmed_neighbors_by_codimension() {
    let dbl = DisjointBoxLayout::new(cube(0, 5), IntVect::splat(2), &NoComm).unwrap();
    let centre = dbl.box_index(dbl.num_boxes() / 2);
    for codim in 1..=SPACE_DIM as u32 {
        let faces_only: usize = dbl
            .neighbors(centre, Trim::NONE)
            .filter(|n| n.dir.norm1() == codim)
            .count();
        // Choose-codim faces of the D-cube, two orientations per axis set.
        let choose = {
            let (n, k) = (SPACE_DIM, codim as usize);
            (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
        };
        assert_eq!(faces_only, choose << codim);
    }
}

#[test]
fn periodic_images_wrap_to_far_side() {
    let dbl = DisjointBoxLayout::new(cube(0, 7), IntVect::splat(2), &NoComm).unwrap();
    let nb = dbl.box_dimensions();
    // Box at the low corner: wrap through every periodic low face.
    let corner = dbl.box_index(0);
    for n in dbl.periodic_neighbors(corner, Trim::NONE, Periodic::ALL) {
        // Outward direction leaves the lattice in at least one dimension.
        let lattice = dbl.lattice_coords(n.bidx.global());
        let mut leaves = false;
        for d in 0..SPACE_DIM {
            match n.dir[d] {
                -1 => {
                    // Wrapped: the image must be on the high side.
                    leaves = true;
                    assert_eq!(lattice[d], nb[d] - 1);
                }
                0 => assert_eq!(lattice[d], 0),
                1 => assert_eq!(lattice[d], 1),
                _ => unreachable!(),
            }
        }
        assert!(leaves);
    }
    // All 3^D - 2^D surrounding positions that leave the lattice are found.
    let expect = 3usize.pow(SPACE_DIM as u32) - 2usize.pow(SPACE_DIM as u32);
    assert_eq!(
        dbl.periodic_neighbors(corner, Trim::NONE, Periodic::ALL).count(),
        expect
    );
}

#[test]
fn periodic_respects_axis_mask() {
    let dbl = DisjointBoxLayout::new(cube(0, 7), IntVect::splat(2), &NoComm).unwrap();
    let corner = dbl.box_index(0);
    for n in dbl.periodic_neighbors(corner, Trim::NONE, Periodic::X) {
        // Only the x face may be crossed.
        assert_eq!(n.dir[0], -1);
        for d in 1..SPACE_DIM {
            assert!(n.dir[d] >= 0);
        }
    }
    assert_eq!(
        dbl.periodic_neighbors(corner, Trim::NONE, Periodic::NONE).count(),
        0
    );
}

#[test]
fn deep_copy_decouples_identity() {
    let dbl = DisjointBoxLayout::new(cube(0, 9), IntVect::splat(5), &NoComm).unwrap();
    let copy = dbl.deep_copy();
    assert_ne!(dbl.tag(), copy.tag());
    for k in 0..dbl.num_boxes() {
        assert_eq!(dbl.entry(k), copy.entry(k));
    }
}
