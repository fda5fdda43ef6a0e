//! Lowering behavior visible through the public AST.

use proptest::prelude::*;
use rstest::rstest;
use typefront::parser::{ParseOptions, TextEdit, incremental_parse, parse};
use typefront::syntax::{Ast, AstFlags, AstId, AstKind, BinaryOp, LowerError, lower};

fn lower_text(text: &str) -> Ast {
    lower(&parse(text, "test.ts", &ParseOptions::default())).unwrap()
}

fn statements(ast: &Ast) -> Vec<AstId> {
    match ast.kind(ast.root()) {
        AstKind::Script { statements } => statements.clone(),
        other => panic!("unexpected root {:?}", other),
    }
}

fn enum_members(text: &str) -> Vec<(String, Option<f64>, bool)> {
    let ast = lower_text(text);
    let AstKind::Enum { members, .. } = ast.kind(statements(&ast)[0]) else {
        panic!("expected an enum");
    };
    members
        .iter()
        .map(|&m| {
            let AstKind::EnumMember { name, value, constant } = ast.kind(m) else {
                panic!("expected an enum member");
            };
            let name = ast.text(*name).map(|s| s.to_string()).unwrap_or_default();
            (name, *constant, ast.flags(*value).contains(AstFlags::SYNTHESIZED))
        })
        .collect()
}

// =============================================================================
// ENUM DEFAULT VALUES
// =============================================================================

#[rstest]
#[case::implicit("enum E { A, B, C }", vec![Some(0.0), Some(1.0), Some(2.0)])]
#[case::continues_after_explicit("enum E { A = 5, B }", vec![Some(5.0), Some(6.0)])]
#[case::non_constant("enum E { A = x, B }", vec![None, None])]
#[case::shift("enum E { A = 1 << 3, B }", vec![Some(8.0), Some(9.0)])]
#[case::self_reference("enum E { A = 2, B = E.A }", vec![Some(2.0), Some(2.0)])]
fn test_enum_default_values(#[case] text: &str, #[case] expected: Vec<Option<f64>>) {
    let constants: Vec<_> = enum_members(text).into_iter().map(|(_, c, _)| c).collect();
    assert_eq!(constants, expected);
}

#[test]
fn test_enum_default_values_are_synthesized() {
    let members = enum_members("enum E { A, B = 3, C }");
    let synthesized: Vec<_> = members.iter().map(|(name, _, s)| (name.as_str(), *s)).collect();
    assert_eq!(synthesized, vec![("A", true), ("B", false), ("C", true)]);
}

#[test]
fn test_enum_backing_map_is_initialized_first() {
    let ast = lower_text("enum Color { Red, Green }");
    let AstKind::Enum { initializer, members, .. } = ast.kind(statements(&ast)[0]) else {
        panic!("expected an enum");
    };
    assert_eq!(members.len(), 2);
    assert!(ast.flags(*initializer).contains(AstFlags::SYNTHESIZED));

    // Color || (Color = {})
    let AstKind::Binary { op: BinaryOp::Or, lhs, rhs } = ast.kind(*initializer) else {
        panic!("expected `||`, got {:?}", ast.kind(*initializer));
    };
    assert_eq!(ast.text(*lhs).map(|s| s.to_string()).as_deref(), Some("Color"));
    let AstKind::Binary { op: BinaryOp::Assign, lhs: target, rhs: map } = ast.kind(*rhs) else {
        panic!("expected an assignment");
    };
    assert_eq!(ast.text(*target).map(|s| s.to_string()).as_deref(), Some("Color"));
    assert!(matches!(ast.kind(*map), AstKind::ObjectLiteral { properties } if properties.is_empty()));
}

#[test]
fn test_empty_enum_still_has_backing_map() {
    let ast = lower_text("enum E { }");
    let AstKind::Enum { initializer, members, .. } = ast.kind(statements(&ast)[0]) else {
        panic!("expected an enum");
    };
    assert!(members.is_empty());
    assert!(matches!(ast.kind(*initializer), AstKind::Binary { op: BinaryOp::Or, .. }));
}

// =============================================================================
// STRUCTURE
// =============================================================================

#[test]
fn test_every_node_has_parent_except_root() {
    let ast = lower_text("module M { export class C { m(a: number) { return a + 1; } } }");
    for id in ast.preorder(ast.root()) {
        if id == ast.root() {
            assert_eq!(ast.parent(id), None);
        } else {
            let parent = ast.parent(id).unwrap();
            assert!(ast.range(parent).contains_range(ast.range(id)));
        }
    }
}

#[test]
fn test_class_heritage() {
    let ast = lower_text("class D extends B implements I, J {}");
    let AstKind::Class { extends, implements, .. } = ast.kind(statements(&ast)[0]) else {
        panic!("expected a class");
    };
    assert!(extends.is_some());
    assert_eq!(implements.len(), 2);
}

#[test]
fn test_not_yet_lowered_names_construct() {
    let tree = parse("with (o) { x; }", "w.ts", &ParseOptions::default());
    let err = lower(&tree).unwrap_err();
    let LowerError::NotYetLowered { construct, path, .. } = &err;
    assert!(construct.contains("with"));
    assert_eq!(path.as_str(), "w.ts");
    assert!(err.to_string().contains("with"));
}

// =============================================================================
// IDEMPOTENCE
// =============================================================================

#[test]
fn test_lowering_twice_is_identical() {
    let tree = parse(
        "enum E { A = 1 << 2, B }\nmodule A.B { export interface I<T> { (x: T): T; [k: string]: any; } }",
        "p.ts",
        &ParseOptions::default(),
    );
    assert_eq!(lower(&tree), lower(&tree));
}

const STATEMENTS: &[&str] = &[
    "var a = 1, b: string;\n",
    "function f<T>(x?: T, ...rest: any[]): T { return x; }\n",
    "class C extends D { static s = 0; constructor(private p: number) { super(); } }\n",
    "module N.O { export enum K { X, Y = X + 1 } }\n",
    "interface I { p: string; m(): void; new (): I; }\n",
    "for (var i = 0; i < 10; i++) { continue; }\n",
    "for (var k in o) { delete o[k]; }\n",
    "try { throw e; } catch (err) { } finally { }\n",
    "var g = (y: number) => y * 2;\n",
    "switch (s) { case 1: break; default: }\n",
    "import q = N.O;\n",
    "declare var dv: { a: number; b?: string; };\n",
];

proptest! {
    #[test]
    fn prop_lowering_is_idempotent(parts in prop::collection::vec(prop::sample::select(STATEMENTS), 0..10)) {
        let text = parts.concat();
        let tree = parse(&text, "prop.ts", &ParseOptions::default());
        prop_assert_eq!(lower(&tree), lower(&tree));
    }

    #[test]
    fn prop_incremental_tree_lowers_like_full_tree(
        parts in prop::collection::vec(prop::sample::select(STATEMENTS), 1..8),
        last in prop::sample::select(STATEMENTS),
    ) {
        let text = parts.concat();
        let old = parse(&text, "prop.ts", &ParseOptions::default());
        let edit = TextEdit::insert(typefront::TextSize::of(text.as_str()), last);
        let new_text = edit.apply(&text).unwrap();
        let incremental = incremental_parse(&old, &edit, &new_text).unwrap();
        let fresh = parse(&new_text, "prop.ts", &ParseOptions::default());
        prop_assert_eq!(lower(&incremental.tree), lower(&fresh));
    }
}
