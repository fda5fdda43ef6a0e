//! Common source code fixtures for tests.

// Declarations
pub const SIMPLE_CLASS: &str = "class Point { x: number; y: number; }";

pub const NESTED_MODULES: &str = r#"
module Outer {
    export module Inner {
        export class Deep {}
    }
}
"#;

pub const SHAPES: &str = r#"
module Shapes {
    export interface Shape { area(): number; }
    export class Circle implements Shape {
        constructor(public radius: number) {}
        area() { return this.radius * this.radius * 3; }
    }
}
var c = new Shapes.Circle(2);
var a = c.area();
"#;

// Merging
pub const SPLIT_MODULE: &str = "module M { export var a = 1; }\nmodule M { export var b = 'b'; }";

// Circularity
pub const SELF_ALIAS: &str = "type T = T;";
pub const CIRCULAR_INTERFACES: &str = "interface A extends B {}\ninterface B extends A {}";

/// `count` variable statements, one per line.
pub fn numbered_statements(count: usize) -> String {
    (0..count).map(|i| format!("var v{i} = {i};\n")).collect()
}
