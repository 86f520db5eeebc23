//! Dispatch resolution: pick the best method for a tuple of concrete classes.
//!
//! Every signature is scored per argument: the inheritance distance from the
//! argument's class to the declared class, `ANY_DISTANCE` for `ANY`, and
//! zero for `missing` matched against `missing`. A signature with any
//! unreachable position is inapplicable. The smallest total wins; ties go to
//! the first signature by canonical rendering and produce an
//! [`AmbiguousDispatch`] warning.
//!
//! Resolution is a pure function of the hierarchy and the generic. Caching
//! and invocation live in the dispatcher.

use serde::Serialize;

use crate::class::{render_signature, ClassName, MethodId};
use crate::error::{AmbiguousDispatch, DispatchError};
use crate::hierarchy::ClassHierarchy;
use crate::table::{GenericFunction, MethodSignature};

/// Distance charged for an `ANY` position.
///
/// Real distances are `u32` and totals are summed in `u64`, so a single
/// `ANY` outweighs any chain of real hops.
pub const ANY_DISTANCE: u64 = u32::MAX as u64;

/// An applicable signature and its total distance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub signature: &'a MethodSignature,
    pub distance: u64,
}

/// The outcome of resolving one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub generic: String,
    pub method: MethodId,
    /// The winning signature's classes.
    pub signature: Vec<ClassName>,
    pub distance: u64,
    /// Present when other signatures tied with the winner.
    pub ambiguity: Option<AmbiguousDispatch>,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }
}

/// Score one position of a signature. `None` means inapplicable.
pub fn position_distance(hierarchy: &ClassHierarchy, concrete: &ClassName, declared: &ClassName) -> Option<u64> {
    if declared.is_any() {
        return Some(ANY_DISTANCE);
    }
    if declared.is_missing() {
        return if concrete.is_missing() { Some(0) } else { None };
    }
    hierarchy
        .distance(concrete.as_str(), declared.as_str())
        .map(u64::from)
}

/// Total distance of a signature for a call, or `None` if inapplicable.
pub fn signature_distance(
    hierarchy: &ClassHierarchy,
    declared: &[ClassName],
    concrete: &[ClassName],
) -> Option<u64> {
    if declared.len() != concrete.len() {
        return None;
    }
    let mut total = 0u64;
    for (have, want) in concrete.iter().zip(declared) {
        total += position_distance(hierarchy, have, want)?;
    }
    Some(total)
}

/// All applicable signatures, best first: by total distance, then canonical
/// rendering, then class by class when two renderings coincide (names may
/// themselves contain `#`). Registration order never affects the ranking.
pub fn rank_candidates<'a>(
    hierarchy: &ClassHierarchy,
    generic: &'a GenericFunction,
    concrete: &[ClassName],
) -> Vec<Candidate<'a>> {
    let mut ranked: Vec<(Candidate<'a>, String)> = generic
        .signatures()
        .iter()
        .filter_map(|signature| {
            signature_distance(hierarchy, &signature.classes, concrete).map(|distance| {
                (
                    Candidate {
                        signature,
                        distance,
                    },
                    signature.render(),
                )
            })
        })
        .collect();
    ranked.sort_by(|(a, ra), (b, rb)| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| ra.cmp(rb))
            .then_with(|| a.signature.classes.cmp(&b.signature.classes))
    });
    ranked.into_iter().map(|(candidate, _)| candidate).collect()
}

/// Resolve the best method of `generic` for `concrete`.
pub fn resolve(
    hierarchy: &ClassHierarchy,
    generic: &GenericFunction,
    concrete: &[ClassName],
) -> Result<Resolution, DispatchError> {
    check_call_arity(generic, concrete)?;
    let ranked = rank_candidates(hierarchy, generic, concrete);
    pick(generic, concrete, &ranked).ok_or_else(|| DispatchError::NoApplicableMethod {
        generic: generic.name.clone(),
        classes: concrete.to_vec(),
    })
}

/// Resolve the method that would have been chosen had `current` (and
/// everything ranked ahead of it) not existed.
///
/// Excluding the whole prefix keeps a chain of `call_next` calls moving
/// strictly down the ranking, so it always terminates.
pub fn resolve_next(
    hierarchy: &ClassHierarchy,
    generic: &GenericFunction,
    concrete: &[ClassName],
    current: MethodId,
) -> Result<Resolution, DispatchError> {
    check_call_arity(generic, concrete)?;
    let ranked = rank_candidates(hierarchy, generic, concrete);
    let start = ranked
        .iter()
        .position(|c| c.signature.id == current)
        .map_or(0, |pos| pos + 1);
    let rest: Vec<Candidate<'_>> = ranked[start..]
        .iter()
        .filter(|c| c.signature.id != current)
        .cloned()
        .collect();

    pick(generic, concrete, &rest).ok_or_else(|| DispatchError::NoNextMethod {
        generic: generic.name.clone(),
        current: generic
            .signatures()
            .iter()
            .find(|m| m.id == current)
            .map(|m| m.classes.clone())
            .unwrap_or_default(),
        classes: concrete.to_vec(),
    })
}

fn check_call_arity(generic: &GenericFunction, concrete: &[ClassName]) -> Result<(), DispatchError> {
    if concrete.len() != generic.arity() {
        return Err(DispatchError::ArityMismatch {
            generic: generic.name.clone(),
            expected: generic.arity(),
            found: concrete.len(),
        });
    }
    Ok(())
}

/// Take the head of a ranked list, reporting anything tied with it.
fn pick(generic: &GenericFunction, concrete: &[ClassName], ranked: &[Candidate<'_>]) -> Option<Resolution> {
    let best = ranked.first()?;
    let runners_up: Vec<Vec<ClassName>> = ranked[1..]
        .iter()
        .take_while(|c| c.distance == best.distance)
        .map(|c| c.signature.classes.clone())
        .collect();

    let ambiguity = if runners_up.is_empty() {
        None
    } else {
        Some(AmbiguousDispatch {
            generic: generic.name.clone(),
            classes: concrete.to_vec(),
            distance: best.distance,
            winner: best.signature.classes.clone(),
            runners_up,
        })
    };

    tracing::trace!(
        generic = %generic.name,
        call = %render_signature(concrete),
        winner = %best.signature.render(),
        distance = best.distance,
        "resolved"
    );

    Some(Resolution {
        generic: generic.name.clone(),
        method: best.signature.id,
        signature: best.signature.classes.clone(),
        distance: best.distance,
        ambiguity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::classes;
    use crate::hierarchy::ClassDef;
    use crate::table::MethodTable;

    fn numbers() -> ClassHierarchy {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("A1", Vec::<&str>::new())).unwrap();
        h.register(ClassDef::new("A2", ["A1"])).unwrap();
        h
    }

    fn foo(signatures: &[[&str; 2]]) -> MethodTable {
        let mut table = MethodTable::new();
        table.register_generic("foo", ["x", "y"]).unwrap();
        for sig in signatures {
            table.register_method("foo", classes(*sig)).unwrap();
        }
        table
    }

    #[test]
    fn exact_match_wins() {
        let h = numbers();
        let table = foo(&[["A1", "A1"], ["A2", "A2"]]);
        let r = resolve(&h, table.get("foo").unwrap(), &classes(["A2", "A2"])).unwrap();
        assert_eq!(r.signature, classes(["A2", "A2"]));
        assert_eq!(r.distance, 0);
        assert!(!r.is_ambiguous());
    }

    #[test]
    fn tie_picks_lexicographic_first_and_warns() {
        let h = numbers();
        // Registered in reverse order to show registration order is ignored.
        let table = foo(&[["A2", "A1"], ["A1", "A2"]]);
        let r = resolve(&h, table.get("foo").unwrap(), &classes(["A2", "A2"])).unwrap();
        assert_eq!(r.signature, classes(["A1", "A2"]));
        assert_eq!(r.distance, 1);
        let warning = r.ambiguity.expect("tie should be reported");
        assert_eq!(warning.winner, classes(["A1", "A2"]));
        assert_eq!(warning.runners_up, vec![classes(["A2", "A1"])]);
    }

    #[test]
    fn any_only_as_last_resort() {
        let h = numbers();
        let table = foo(&[["ANY", "ANY"], ["A1", "ANY"], ["A1", "A1"]]);
        let gf = table.get("foo").unwrap();

        let r = resolve(&h, gf, &classes(["A2", "A2"])).unwrap();
        assert_eq!(r.signature, classes(["A1", "A1"]));

        let r = resolve(&h, gf, &classes(["A2", "character"])).unwrap();
        assert_eq!(r.signature, classes(["A1", "ANY"]));
        assert_eq!(r.distance, 1 + ANY_DISTANCE);

        let r = resolve(&h, gf, &classes(["character", "character"])).unwrap();
        assert_eq!(r.signature, classes(["ANY", "ANY"]));
    }

    #[test]
    fn deep_chain_still_beats_any() {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("C0", Vec::<&str>::new())).unwrap();
        for i in 1..50 {
            let name = format!("C{}", i);
            let parent = format!("C{}", i - 1);
            h.register(ClassDef::new(name.as_str(), [parent.as_str()])).unwrap();
        }
        let mut table = MethodTable::new();
        table.register_generic("g", ["x", "y"]).unwrap();
        table.register_method("g", classes(["C0", "C0"])).unwrap();
        table.register_method("g", classes(["ANY", "C49"])).unwrap();
        let r = resolve(&h, table.get("g").unwrap(), &classes(["C49", "C49"])).unwrap();
        assert_eq!(r.signature, classes(["C0", "C0"]));
        assert_eq!(r.distance, 98);
    }

    #[test]
    fn missing_matches_only_missing() {
        let h = numbers();
        let mut table = MethodTable::new();
        table.register_generic("area", ["shape", "scale"]).unwrap();
        table.register_method("area", classes(["A1", "missing"])).unwrap();
        table.register_method("area", classes(["A1", "ANY"])).unwrap();
        let gf = table.get("area").unwrap();

        let r = resolve(&h, gf, &classes(["A2", "missing"])).unwrap();
        assert_eq!(r.signature, classes(["A1", "missing"]));
        assert_eq!(r.distance, 1);

        let r = resolve(&h, gf, &classes(["A2", "A1"])).unwrap();
        assert_eq!(r.signature, classes(["A1", "ANY"]));
    }

    #[test]
    fn no_applicable_method() {
        let h = numbers();
        let table = foo(&[["A2", "A2"]]);
        let err = resolve(&h, table.get("foo").unwrap(), &classes(["A1", "A2"])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::NoApplicableMethod {
                generic: "foo".to_string(),
                classes: classes(["A1", "A2"]),
            }
        );
    }

    #[test]
    fn call_arity_checked() {
        let h = numbers();
        let table = foo(&[["A1", "A1"]]);
        let err = resolve(&h, table.get("foo").unwrap(), &classes(["A1"])).unwrap_err();
        assert!(matches!(err, DispatchError::ArityMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn next_method_walks_down_the_ranking() {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("Vehicle", Vec::<&str>::new())).unwrap();
        h.register(ClassDef::new("Car", ["Vehicle"])).unwrap();
        let mut table = MethodTable::new();
        table.register_generic("inspect", ["v", "i"]).unwrap();
        let car = table.register_method("inspect", classes(["Car", "Inspector"])).unwrap().id;
        let vehicle = table.register_method("inspect", classes(["Vehicle", "Inspector"])).unwrap().id;
        let any = table.register_method("inspect", classes(["ANY", "Inspector"])).unwrap().id;
        let gf = table.get("inspect").unwrap();
        let call = classes(["Car", "Inspector"]);

        let next = resolve_next(&h, gf, &call, car).unwrap();
        assert_eq!(next.method, vehicle);
        let next = resolve_next(&h, gf, &call, vehicle).unwrap();
        assert_eq!(next.method, any);
        let err = resolve_next(&h, gf, &call, any).unwrap_err();
        assert!(matches!(err, DispatchError::NoNextMethod { .. }));
    }

    #[test]
    fn next_method_of_a_tied_winner_is_the_runner_up() {
        let h = numbers();
        let table = foo(&[["A1", "A2"], ["A2", "A1"]]);
        let gf = table.get("foo").unwrap();
        let call = classes(["A2", "A2"]);
        let first = resolve(&h, gf, &call).unwrap();
        let next = resolve_next(&h, gf, &call, first.method).unwrap();
        assert_eq!(next.signature, classes(["A2", "A1"]));
        assert!(resolve_next(&h, gf, &call, next.method).is_err());
    }

    #[test]
    fn colliding_renderings_rank_the_same_in_any_registration_order() {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("X", ["A#B", "A"])).unwrap();
        h.register(ClassDef::new("Y", ["C", "B#C"])).unwrap();
        let call = classes(["X", "Y"]);

        let mut winners = Vec::new();
        for order in [[["A#B", "C"], ["A", "B#C"]], [["A", "B#C"], ["A#B", "C"]]] {
            let table = foo(&order);
            let gf = table.get("foo").unwrap();
            let r = resolve(&h, gf, &call).unwrap();
            assert!(r.is_ambiguous());
            winners.push(r.signature);
        }
        assert_eq!(winners[0], classes(["A", "B#C"]));
        assert_eq!(winners[0], winners[1]);
    }
}
