//! Operation kernels, cross-validated against the multi-terminal reference

mod common;

use common::Mtbdd;
use hydd::{Edge, Manager};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const VARS: [u32; 6] = [0, 1, 2, 3, 4, 5];

fn manager() -> Manager {
    Manager::new(1 << 18, 1 << 16, 0)
}

/// A random set as both a tagged edge and a reference diagram; built cube
/// by cube through both implementations, which exercises `union_cube`
/// against the reference on every step.
fn random_set(
    m: &Manager,
    reference: &mut Mtbdd,
    rng: &mut StdRng,
    cubes: usize,
) -> (Edge, common::Ref) {
    let dom = m.var_set(&VARS).unwrap();
    let ref_dom = reference.var_set(&VARS);
    let mut set = Edge::FALSE;
    let mut ref_set = common::FALSE;
    for _ in 0..cubes {
        let values: Vec<u8> = (0..VARS.len()).map(|_| rng.gen_range(0..3)).collect();
        set = m.union_cube(set, dom, &values).unwrap();
        ref_set = reference.union_cube(ref_set, &VARS, &values);
        assert_eq!(set, m.from_mtbdd(&*reference, ref_set, ref_dom).unwrap());
    }
    (set, ref_set)
}

#[test]
fn union_cube_matches_reference() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..8 {
        let cubes = rng.gen_range(0..40);
        random_set(&m, &mut reference, &mut rng, cubes);
    }
}

#[test]
fn and_or_match_reference() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(7);
    let dom = m.var_set(&VARS).unwrap();
    let ref_dom = reference.var_set(&VARS);

    for _ in 0..8 {
        let cubes = rng.gen_range(0..30);
        let (a, ref_a) = random_set(&m, &mut reference, &mut rng, cubes);
        let cubes = rng.gen_range(0..30);
        let (b, ref_b) = random_set(&m, &mut reference, &mut rng, cubes);

        let ref_and = reference.and(ref_a, ref_b);
        assert_eq!(
            m.and(a, b, dom).unwrap(),
            m.from_mtbdd(&reference, ref_and, ref_dom).unwrap()
        );

        let ref_or = reference.or(ref_a, ref_b);
        assert_eq!(
            m.or(a, b, dom).unwrap(),
            m.from_mtbdd(&reference, ref_or, ref_dom).unwrap()
        );

        // commutativity comes with canonicity
        assert_eq!(m.and(a, b, dom).unwrap(), m.and(b, a, dom).unwrap());
        assert_eq!(m.or(a, b, dom).unwrap(), m.or(b, a, dom).unwrap());
    }
}

#[test]
fn or_is_associative() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(11);
    let dom = m.var_set(&VARS).unwrap();

    for _ in 0..4 {
        let (a, _) = random_set(&m, &mut reference, &mut rng, 10);
        let (b, _) = random_set(&m, &mut reference, &mut rng, 10);
        let (c, _) = random_set(&m, &mut reference, &mut rng, 10);
        let ab = m.or(a, b, dom).unwrap();
        let bc = m.or(b, c, dom).unwrap();
        assert_eq!(m.or(ab, c, dom).unwrap(), m.or(a, bc, dom).unwrap());
    }
}

#[test]
fn ite_matches_reference() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(13);
    let dom = m.var_set(&VARS).unwrap();
    let ref_dom = reference.var_set(&VARS);

    for _ in 0..6 {
        let (a, ref_a) = random_set(&m, &mut reference, &mut rng, 15);
        let (b, ref_b) = random_set(&m, &mut reference, &mut rng, 15);
        let (c, ref_c) = random_set(&m, &mut reference, &mut rng, 15);

        let ref_ite = reference.ite(ref_a, ref_b, ref_c);
        assert_eq!(
            m.ite(a, b, c, dom).unwrap(),
            m.from_mtbdd(&reference, ref_ite, ref_dom).unwrap()
        );
    }
}

#[test]
fn not_complements_the_count() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(17);
    let dom = m.var_set(&VARS).unwrap();
    let ref_dom = reference.var_set(&VARS);

    for _ in 0..6 {
        let cubes = rng.gen_range(1..40);
        let (dd, ref_dd) = random_set(&m, &mut reference, &mut rng, cubes);
        let not_dd = m.not(dd, dom).unwrap();

        let ref_not = reference.not(ref_dd);
        assert_eq!(not_dd, m.from_mtbdd(&reference, ref_not, ref_dom).unwrap());

        let total = (VARS.len() as f64).exp2();
        assert_eq!(m.sat_count(dd, dom) + m.sat_count(not_dd, dom), total);
        // double complement
        assert_eq!(m.not(not_dd, dom).unwrap(), dd);
    }
}

#[test]
fn sat_count_matches_reference() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(19);
    let dom = m.var_set(&VARS).unwrap();

    for _ in 0..8 {
        let cubes = rng.gen_range(0..60);
        let (dd, ref_dd) = random_set(&m, &mut reference, &mut rng, cubes);
        assert_eq!(m.sat_count(dd, dom), reference.sat_count(ref_dd, &VARS));
    }
}

#[test]
fn exists_matches_reference() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(23);
    let dom = m.var_set(&VARS).unwrap();
    let ref_dom = reference.var_set(&VARS);

    for _ in 0..6 {
        let cubes = rng.gen_range(1..40);
        let (dd, ref_dd) = random_set(&m, &mut reference, &mut rng, cubes);
        let quantified = [1u32, 3];
        let vars = m.var_set(&quantified).unwrap();

        let mut ref_result = ref_dd;
        for &var in &quantified {
            ref_result = reference.exists(ref_result, var);
        }
        assert_eq!(
            m.exists(dd, vars, dom).unwrap(),
            m.from_mtbdd(&reference, ref_result, ref_dom).unwrap()
        );
    }
}

#[test]
fn exists_dom_projects() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(29);

    for _ in 0..6 {
        let cubes = rng.gen_range(1..40);
        let (dd, ref_dd) = random_set(&m, &mut reference, &mut rng, cubes);
        let kept = [0u32, 2, 5];
        let new_dom = m.var_set(&kept).unwrap();
        let ref_new_dom = reference.var_set(&kept);

        let mut ref_result = ref_dd;
        for var in [1u32, 3, 4] {
            ref_result = reference.exists(ref_result, var);
        }
        assert_eq!(
            m.exists_dom(dd, new_dom).unwrap(),
            m.from_mtbdd(&reference, ref_result, ref_new_dom).unwrap()
        );
    }
}

#[test]
fn extend_domain_matches_conversion() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(31);

    let sub = [1u32, 3, 4];
    let sub_dom = m.var_set(&sub).unwrap();
    let ref_sub_dom = reference.var_set(&sub);
    let full_dom = m.var_set(&VARS).unwrap();
    let ref_full_dom = reference.var_set(&VARS);

    for _ in 0..6 {
        let mut set = Edge::FALSE;
        let mut ref_set = common::FALSE;
        for _ in 0..rng.gen_range(1..30) {
            let values: Vec<u8> = (0..sub.len()).map(|_| rng.gen_range(0..2)).collect();
            set = m.union_cube(set, sub_dom, &values).unwrap();
            ref_set = reference.union_cube(ref_set, &sub, &values);
        }
        assert_eq!(set, m.from_mtbdd(&reference, ref_set, ref_sub_dom).unwrap());

        assert_eq!(
            m.extend_domain(set, sub_dom, full_dom).unwrap(),
            m.from_mtbdd(&reference, ref_set, ref_full_dom).unwrap()
        );
    }
}

#[test]
fn mtbdd_round_trip() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(37);
    let ref_dom = reference.var_set(&VARS);
    let dom = m.var_set(&VARS).unwrap();

    for _ in 0..6 {
        let cubes = rng.gen_range(0..40);
        let (dd, ref_dd) = random_set(&m, &mut reference, &mut rng, cubes);
        // out and back in reproduces the edge
        let out = m.to_mtbdd(&mut reference, dd, dom);
        assert_eq!(out, ref_dd);
        assert_eq!(m.from_mtbdd(&reference, out, ref_dom).unwrap(), dd);
    }
}

#[test]
fn leaf_conversion_round_trip() {
    let m = manager();
    let mut reference = Mtbdd::new();

    // if x0 then 42 else 17, over the domain {0}
    let forty_two = reference.leaf(0, 42);
    let seventeen = reference.leaf(0, 17);
    let picked = reference.branch(0, seventeen, forty_two);
    let ref_dom = reference.var_set(&[0]);

    let dd = m.from_mtbdd(&reference, picked, ref_dom).unwrap();
    let dom = m.var_set(&[0]).unwrap();
    let high = m.eval(dd, 0, true, hydd::NO_VAR);
    assert_eq!(m.leaf_value(high), 42);
    assert_eq!(m.to_mtbdd(&mut reference, dd, dom), picked);
}

#[test]
fn enumeration_is_total_and_ordered() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(41);
    let dom = m.var_set(&VARS).unwrap();

    for _ in 0..6 {
        let cubes = rng.gen_range(1..40);
        let (dd, _) = random_set(&m, &mut reference, &mut rng, cubes);
        let expected = m.sat_count(dd, dom) as usize;

        let mut values = [0u8; 6];
        let mut seen = Vec::new();
        let mut res = m.enum_first(dd, dom, &mut values);
        while res != Edge::FALSE {
            assert_eq!(res, Edge::TRUE);
            seen.push(values.to_vec());
            res = m.enum_next(dd, dom, &mut values);
        }

        assert_eq!(seen.len(), expected);
        // lexicographic order, no duplicates
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        // every enumerated assignment is a member
        for assignment in &seen {
            let mut walk = dd;
            for (i, &value) in assignment.iter().enumerate() {
                let next = if i + 1 < VARS.len() {
                    VARS[i + 1]
                } else {
                    hydd::NO_VAR
                };
                walk = m.eval(walk, VARS[i], value == 1, next);
            }
            assert_eq!(walk, Edge::TRUE);
        }

        // the sequential callback enumeration agrees, in the same order
        let mut seq = Vec::new();
        m.enum_seq(dd, dom, |vals| seq.push(vals.to_vec())).unwrap();
        assert_eq!(seq, seen);

        // the parallel enumeration yields the same assignments, unordered
        let par = std::sync::Mutex::new(Vec::new());
        m.enum_par(dd, dom, |vals| par.lock().unwrap().push(vals.to_vec()))
            .unwrap();
        let mut par = par.into_inner().unwrap();
        par.sort();
        assert_eq!(par, seen);
    }
}

#[test]
fn collect_can_rebuild_the_set() {
    let m = manager();
    let mut reference = Mtbdd::new();
    let mut rng = StdRng::seed_from_u64(43);
    let dom = m.var_set(&VARS).unwrap();

    for _ in 0..4 {
        let cubes = rng.gen_range(1..25);
        let (dd, _) = random_set(&m, &mut reference, &mut rng, cubes);
        // the identity fold: emit each assignment as a cube over the same
        // domain and OR everything back together
        let rebuilt = m
            .collect(dd, dom, dom, |values| Ok(m.cube(dom, values)?))
            .unwrap();
        assert_eq!(rebuilt, dd);
    }
}
