pub mod knot_multiplicity;
pub mod knot_vector;

pub use knot_multiplicity::*;
pub use knot_vector::*;

use nalgebra::RealField;

/// Merge two sorted knot sequences into their sorted union,
/// collapsing values that are equal within floating point epsilon.
pub(crate) fn sorted_union<T: RealField + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    let mut merged = Vec::new();
    let mut ai = 0;
    let mut bi = 0;
    while ai < a.len() || bi < b.len() {
        if ai >= a.len() {
            merged.push(b[bi]);
            bi += 1;
            continue;
        } else if bi >= b.len() {
            merged.push(a[ai]);
            ai += 1;
            continue;
        }

        let diff = a[ai] - b[bi];

        if diff.abs() < T::default_epsilon() {
            merged.push(a[ai]);
            ai += 1;
            bi += 1;
            continue;
        }

        if diff > T::zero() {
            merged.push(b[bi]);
            bi += 1;
            continue;
        }

        merged.push(a[ai]);
        ai += 1;
    }

    merged
}

/// Knots of the sorted sequence `a` that are missing from the sorted sequence `b`.
pub(crate) fn sorted_difference<T: RealField + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    let mut result = Vec::new();
    let mut ai = 0;
    let mut bi = 0;

    while ai < a.len() {
        if bi >= b.len() {
            result.push(a[ai]);
            ai += 1;
            continue;
        }

        if (a[ai] - b[bi]).abs() < T::default_epsilon() {
            ai += 1;
            bi += 1;
            continue;
        }

        result.push(a[ai]);
        ai += 1;
    }

    result
}
