//! Unification (⊔) of two schema observations.
//!
//! Rules, first match wins:
//! 1. `Null ⊔ X = X?`
//! 2. same leaf kind → that kind, optional OR'd
//! 3. `Integer ⊔ Real = Real` (the only implicit widening)
//! 4. arrays unify their element schemas
//! 5. same-named objects merge member-wise; differently named objects, or an
//!    object meeting a key/value map, break the naming invariant
//! 6. same-named key/value maps unify their value schemas
//! 7. anything else is a conflict, settled by [`ConflictPolicy`]
//!
//! Rules 1-6 are commutative and associative up to member order. The
//! `PreferFirst` policy for rule 7 is deterministic but favours the left side.
use tracing::warn;

use crate::config::ConflictPolicy;
use crate::error::{Error, Result};
use crate::schema::{ObjectSchema, SchemaNode, SchemaPath};

#[derive(Clone, Copy, Debug, Default)]
pub struct Unifier {
    policy: ConflictPolicy,
}

impl Unifier {
    pub fn new(policy: ConflictPolicy) -> Self { Self { policy } }

    pub fn unify(&self, a: SchemaNode, b: SchemaNode) -> Result<SchemaNode> {
        use SchemaNode::*;
        match (a, b) {
            (Null, other) | (other, Null) => Ok(other.optional()),

            (Boolean { optional: x }, Boolean { optional: y }) => Ok(Boolean { optional: x || y }),
            (Integer { optional: x }, Integer { optional: y }) => Ok(Integer { optional: x || y }),
            (Real { optional: x }, Real { optional: y }) => Ok(Real { optional: x || y }),
            (String { optional: x }, String { optional: y }) => Ok(String { optional: x || y }),

            (Integer { optional: x }, Real { optional: y })
            | (Real { optional: x }, Integer { optional: y }) => Ok(Real { optional: x || y }),

            (Array { element: ea, optional: x }, Array { element: eb, optional: y }) => {
                let element = self.unify(*ea, *eb)?;
                Ok(Array { element: Box::new(element), optional: x || y })
            }

            (Object(mut oa), Object(ob)) => {
                if oa.name != ob.name {
                    return Err(invariant(format!(
                        "object `{}` met differently named object `{}` in the same slot",
                        oa.name, ob.name
                    )));
                }
                let optional = oa.optional || ob.optional;
                self.merge_object(&mut oa, ob)?;
                oa.optional = optional;
                Ok(Object(oa))
            }

            (
                KeyValueMap { name: na, value: va, optional: x },
                KeyValueMap { name: nb, value: vb, optional: y },
            ) => {
                if na != nb {
                    return Err(invariant(format!(
                        "key-value map `{na}` met differently named map `{nb}` in the same slot"
                    )));
                }
                let value = self.unify(*va, *vb)?;
                Ok(KeyValueMap { name: na, value: Box::new(value), optional: x || y })
            }

            (Object(obj), KeyValueMap { name, .. }) | (KeyValueMap { name, .. }, Object(obj)) => {
                Err(invariant(format!(
                    "slot observed both as object `{}` and as key-value map `{name}`",
                    obj.name
                )))
            }

            (a, b) => self.resolve_conflict(a, b),
        }
    }

    /// Fold `incoming` into `original`.
    ///
    /// Members missing on either side end up optional; members on both sides
    /// are unified. Nothing is ever removed and no member goes back from
    /// optional to required. New members are appended in `incoming` order.
    pub fn merge_object(&self, original: &mut ObjectSchema, incoming: ObjectSchema) -> Result<()> {
        for (name, node) in original.members.iter_mut() {
            if !incoming.members.contains_key(name) {
                node.set_optional(true);
            }
        }
        for (name, node) in incoming.members {
            match original.members.get_mut(&name) {
                Some(slot) => {
                    let prev = std::mem::take(slot);
                    *slot = self.unify(prev, node).map_err(|e| e.within(&name))?;
                }
                None => {
                    original.members.insert(name, node.optional());
                }
            }
        }
        Ok(())
    }

    fn resolve_conflict(&self, a: SchemaNode, b: SchemaNode) -> Result<SchemaNode> {
        match self.policy {
            ConflictPolicy::Strict => Err(Error::SchemaConflict {
                path: SchemaPath::new(),
                left: a.kind(),
                right: b.kind(),
            }),
            ConflictPolicy::PreferFirst => {
                warn!(kept = %a.kind(), dropped = %b.kind(), "conflicting observations, keeping the first");
                let optional = a.is_optional() || b.is_optional();
                let mut out = a;
                out.set_optional(optional);
                Ok(out)
            }
        }
    }
}

fn invariant(message: String) -> Error {
    Error::InvariantViolation { path: SchemaPath::new(), message }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::sanitize;
    use crate::schema::Kind;
    use pretty_assertions::assert_eq;

    fn obj(name: &str, members: Vec<(&str, SchemaNode)>) -> ObjectSchema {
        members.into_iter().fold(ObjectSchema::new(sanitize(name)), |o, (k, v)| o.with_member(sanitize(k), v))
    }

    fn kv(name: &str, value: SchemaNode) -> SchemaNode {
        SchemaNode::key_value(sanitize(name), value)
    }

    fn strict() -> Unifier { Unifier::new(ConflictPolicy::Strict) }
    fn lenient() -> Unifier { Unifier::new(ConflictPolicy::PreferFirst) }

    /// A spread of nodes with no rule-7 conflicts among same-kind pairs.
    fn samples() -> Vec<SchemaNode> {
        vec![
            SchemaNode::Null,
            SchemaNode::boolean(),
            SchemaNode::boolean().optional(),
            SchemaNode::integer(),
            SchemaNode::real().optional(),
            SchemaNode::string(),
            SchemaNode::array(SchemaNode::Null),
            SchemaNode::array(SchemaNode::integer()),
            obj("a_t", vec![("x", SchemaNode::integer()), ("y", SchemaNode::string().optional())]).into(),
            obj("a_t", vec![("y", SchemaNode::string()), ("z", SchemaNode::Null)]).into(),
            kv("m", SchemaNode::real()),
        ]
    }

    fn compatible(a: &SchemaNode, b: &SchemaNode) -> bool {
        use Kind::*;
        match (a.kind(), b.kind()) {
            (Null, _) | (_, Null) => true,
            (Integer, Real) | (Real, Integer) => true,
            (x, y) => x == y,
        }
    }

    #[test]
    fn idempotent() {
        for x in samples() {
            assert_eq!(strict().unify(x.clone(), x.clone()).unwrap(), x);
        }
    }

    #[test]
    fn commutative_for_compatible_pairs() {
        let xs = samples();
        for a in &xs {
            for b in xs.iter().filter(|b| compatible(a, b)) {
                let ab = strict().unify(a.clone(), b.clone()).unwrap();
                let ba = strict().unify(b.clone(), a.clone()).unwrap();
                assert_eq!(ab, ba, "{:?} vs {:?}", a.kind(), b.kind());
            }
        }
    }

    #[test]
    fn associative_for_compatible_triples() {
        let xs = samples();
        for a in &xs {
            for b in xs.iter().filter(|b| compatible(a, b)) {
                for c in xs.iter().filter(|c| compatible(a, c) && compatible(b, c)) {
                    let u = strict();
                    let left = u.unify(u.unify(a.clone(), b.clone()).unwrap(), c.clone()).unwrap();
                    let right = u.unify(a.clone(), u.unify(b.clone(), c.clone()).unwrap()).unwrap();
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn null_makes_the_other_side_optional() {
        for x in samples().into_iter().filter(|x| !x.is_null()) {
            let left = strict().unify(SchemaNode::Null, x.clone()).unwrap();
            let right = strict().unify(x.clone(), SchemaNode::Null).unwrap();
            assert!(left.is_optional());
            assert_eq!(left.kind(), x.kind());
            assert_eq!(left, right);
        }
        assert_eq!(strict().unify(SchemaNode::Null, SchemaNode::Null).unwrap(), SchemaNode::Null);
    }

    #[test]
    fn integer_widens_to_real_both_ways() {
        let u = strict();
        assert_eq!(u.unify(SchemaNode::integer(), SchemaNode::real()).unwrap(), SchemaNode::real());
        assert_eq!(u.unify(SchemaNode::real(), SchemaNode::integer()).unwrap(), SchemaNode::real());
        assert_eq!(
            u.unify(SchemaNode::integer().optional(), SchemaNode::real()).unwrap(),
            SchemaNode::real().optional()
        );
    }

    #[test]
    fn arrays_unify_elements() {
        let u = strict();
        let got = u.unify(SchemaNode::array(SchemaNode::Null), SchemaNode::array(SchemaNode::integer())).unwrap();
        assert_eq!(got, SchemaNode::array(SchemaNode::integer().optional()));
    }

    #[test]
    fn member_merge_marks_one_sided_members_optional() {
        let mut original = obj("a_t", vec![("a", SchemaNode::integer())]);
        strict().merge_object(&mut original, obj("a_t", vec![("b", SchemaNode::integer())])).unwrap();
        assert_eq!(
            original,
            obj("a_t", vec![("a", SchemaNode::integer().optional()), ("b", SchemaNode::integer().optional())])
        );
        let order: Vec<&str> = original.members.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn member_merge_null_then_value() {
        let mut original = obj("a_t", vec![("a", SchemaNode::Null)]);
        strict().merge_object(&mut original, obj("a_t", vec![("a", SchemaNode::string())])).unwrap();
        assert_eq!(original.member("a"), Some(&SchemaNode::string().optional()));
    }

    #[test]
    fn member_merge_is_monotone() {
        let observations = [
            obj("s_t", vec![("id", SchemaNode::integer()), ("name", SchemaNode::string())]),
            obj("s_t", vec![("id", SchemaNode::integer())]),
            obj("s_t", vec![("id", SchemaNode::real()), ("tag", SchemaNode::string()), ("name", SchemaNode::string())]),
            obj("s_t", vec![("id", SchemaNode::integer()), ("name", SchemaNode::Null)]),
            obj("s_t", vec![("id", SchemaNode::integer()), ("name", SchemaNode::string()), ("tag", SchemaNode::string())]),
        ];
        let u = strict();
        let mut acc = observations[0].clone();
        for next in observations.iter().skip(1) {
            let before = acc.clone();
            u.merge_object(&mut acc, next.clone()).unwrap();
            for (name, node) in &before.members {
                let after = acc.member(name).expect("member dropped");
                assert!(!node.is_optional() || after.is_optional(), "{name} became required");
            }
        }
        assert_eq!(acc.member("id"), Some(&SchemaNode::real()));
        assert_eq!(acc.member("name"), Some(&SchemaNode::string().optional()));
        assert_eq!(acc.member("tag"), Some(&SchemaNode::string().optional()));
        assert_eq!(acc.required_members().map(|k| k.as_str()).collect::<Vec<_>>(), ["id"]);
    }

    #[test]
    fn key_value_maps_unify_values() {
        let got = strict().unify(kv("m", SchemaNode::integer()), kv("m", SchemaNode::real().optional())).unwrap();
        assert_eq!(got, kv("m", SchemaNode::real().optional()));
    }

    #[test]
    fn strict_policy_reports_conflict_with_path() {
        let a: SchemaNode = obj("a_t", vec![("inner", obj("inner_t", vec![("flag", SchemaNode::boolean())]).into())]).into();
        let b: SchemaNode = obj("a_t", vec![("inner", obj("inner_t", vec![("flag", SchemaNode::string())]).into())]).into();
        let err = strict().unify(a, b).unwrap_err();
        match &err {
            Error::SchemaConflict { path, left, right } => {
                assert_eq!(path.to_string(), "inner.flag");
                assert_eq!((*left, *right), (Kind::Boolean, Kind::String));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.to_string(), "schema conflict at `inner.flag`: cannot unify boolean with string");
    }

    #[test]
    fn lenient_policy_keeps_first_and_ors_optional() {
        let u = lenient();
        assert_eq!(u.unify(SchemaNode::string(), SchemaNode::boolean()).unwrap(), SchemaNode::string());
        assert_eq!(
            u.unify(SchemaNode::boolean(), SchemaNode::string().optional()).unwrap(),
            SchemaNode::boolean().optional()
        );
        let arr = SchemaNode::array(SchemaNode::integer());
        assert_eq!(u.unify(arr.clone(), SchemaNode::integer()).unwrap(), arr);
    }

    #[test]
    fn naming_invariant_violations_fail_under_both_policies() {
        for u in [strict(), lenient()] {
            let err = u.unify(obj("a_t", vec![]).into(), obj("b_t", vec![]).into()).unwrap_err();
            assert!(matches!(err, Error::InvariantViolation { .. }), "{err}");

            let err = u.unify(kv("a", SchemaNode::Null), obj("a_t", vec![]).into()).unwrap_err();
            assert!(matches!(err, Error::InvariantViolation { .. }), "{err}");

            let err = u.unify(kv("a", SchemaNode::Null), kv("b", SchemaNode::Null)).unwrap_err();
            assert!(matches!(err, Error::InvariantViolation { .. }), "{err}");
        }
    }
}
