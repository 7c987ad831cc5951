//! Minified printing for query documents. The composed schema renders SDL
//! through graphql-parser's own formatter; outgoing sub-requests, cache keys,
//! and selection-set identity all use the compact form produced here.

use crate::ast::*;

#[derive(Default)]
struct Printer {
    buf: String,
}

impl Printer {
    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Writes `node`, returns true if whitespace is needed before a
    /// following bare token.
    fn document(&mut self, doc: &QueryDocument) {
        let mut space = false;
        for def in &doc.definitions {
            if space {
                self.buf.push(' ');
            }
            space = self.definition(def);
        }
    }

    fn definition(&mut self, def: &Definition) -> bool {
        match def {
            Definition::Operation(op) => self.operation(op),
            Definition::Fragment(frag) => self.fragment_definition(frag),
        }
    }

    fn operation(&mut self, op: &OperationDefinition) -> bool {
        match op {
            OperationDefinition::SelectionSet(ss) => self.selection_set(ss),
            OperationDefinition::Query(q) => self.operation_parts(
                "query",
                q.name.as_deref(),
                &q.variable_definitions,
                &q.directives,
                &q.selection_set,
            ),
            OperationDefinition::Mutation(m) => self.operation_parts(
                "mutation",
                m.name.as_deref(),
                &m.variable_definitions,
                &m.directives,
                &m.selection_set,
            ),
            OperationDefinition::Subscription(s) => self.operation_parts(
                "subscription",
                s.name.as_deref(),
                &s.variable_definitions,
                &s.directives,
                &s.selection_set,
            ),
        }
    }

    fn operation_parts(
        &mut self,
        kind: &str,
        name: Option<&str>,
        variable_definitions: &[VariableDefinition],
        directives: &[Directive],
        selection_set: &SelectionSet,
    ) -> bool {
        self.write(kind);
        if let Some(name) = name {
            self.buf.push(' ');
            self.write(name);
        }
        if !variable_definitions.is_empty() {
            self.write("(");
            // "$a:Int$b:Int" needs no separator, the "$" disambiguates
            for vd in variable_definitions {
                self.variable_definition(vd);
            }
            self.write(")");
        }
        self.directives(directives);
        self.selection_set(selection_set)
    }

    fn variable_definition(&mut self, vd: &VariableDefinition) -> bool {
        self.write("$");
        self.write(&vd.name);
        self.write(":");
        self.graph_type(&vd.var_type);
        if let Some(default) = &vd.default_value {
            self.write("=");
            self.value(default);
        }
        true
    }

    fn fragment_definition(&mut self, frag: &FragmentDefinition) -> bool {
        self.write("fragment ");
        self.write(&frag.name);
        self.write(" on ");
        let TypeCondition::On(cond) = &frag.type_condition;
        self.write(cond);
        self.directives(&frag.directives);
        self.selection_set(&frag.selection_set)
    }

    fn selection_set(&mut self, ss: &SelectionSet) -> bool {
        if ss.items.is_empty() {
            return true;
        }
        self.write("{");
        let mut space = false;
        for item in &ss.items {
            if space {
                self.buf.push(' ');
            }
            space = self.selection(item);
        }
        self.write("}");
        false
    }

    fn selection(&mut self, sel: &Selection) -> bool {
        match sel {
            Selection::Field(f) => self.field(f),
            Selection::FragmentSpread(sp) => {
                self.write("...");
                self.write(&sp.fragment_name);
                self.directives(&sp.directives);
                true
            }
            Selection::InlineFragment(frag) => {
                self.write("...");
                if let Some(TypeCondition::On(cond)) = &frag.type_condition {
                    self.write("on ");
                    self.write(cond);
                }
                self.directives(&frag.directives);
                self.selection_set(&frag.selection_set)
            }
        }
    }

    fn field(&mut self, f: &FieldNode) -> bool {
        if let Some(alias) = &f.alias {
            self.write(alias);
            self.write(":");
        }
        self.write(&f.name);
        self.arguments(&f.arguments);
        self.directives(&f.directives);
        self.selection_set(&f.selection_set)
    }

    fn arguments(&mut self, args: &[(String, GraphValue)]) {
        if args.is_empty() {
            return;
        }
        self.write("(");
        let mut space = false;
        for (name, value) in args {
            if space {
                self.buf.push(' ');
            }
            self.write(name);
            self.write(":");
            space = self.value(value);
        }
        self.write(")");
    }

    fn directives(&mut self, directives: &[Directive]) {
        for d in directives {
            self.write("@");
            self.write(&d.name);
            self.arguments(&d.arguments);
        }
    }

    fn value(&mut self, v: &GraphValue) -> bool {
        match v {
            GraphValue::Variable(name) => {
                self.write("$");
                self.write(name);
                true
            }
            GraphValue::Int(num) => {
                self.write(&format!("{}", num.as_i64().unwrap_or_default()));
                true
            }
            GraphValue::Float(val) => {
                self.write(&format!("{}", val));
                true
            }
            GraphValue::String(val) => {
                self.write("\"");
                for c in val.chars() {
                    match c {
                        '"' => self.write("\\\""),
                        '\\' => self.write("\\\\"),
                        '\n' => self.write("\\n"),
                        '\r' => self.write("\\r"),
                        '\t' => self.write("\\t"),
                        c => self.buf.push(c),
                    }
                }
                self.write("\"");
                true
            }
            GraphValue::Boolean(true) => {
                self.write("true");
                true
            }
            GraphValue::Boolean(false) => {
                self.write("false");
                true
            }
            GraphValue::Null => {
                self.write("null");
                true
            }
            GraphValue::Enum(name) => {
                self.write(name);
                true
            }
            GraphValue::List(items) => {
                self.write("[");
                let mut space = false;
                for item in items {
                    if space {
                        self.buf.push(' ');
                    }
                    space = self.value(item);
                }
                self.write("]");
                false
            }
            GraphValue::Object(fields) => {
                self.write("{");
                let mut space = false;
                for (name, value) in fields {
                    if space {
                        self.buf.push(' ');
                    }
                    self.write(name);
                    self.write(":");
                    space = self.value(value);
                }
                self.write("}");
                false
            }
        }
    }

    fn graph_type(&mut self, t: &GraphType) {
        match t {
            GraphType::NamedType(name) => self.write(name),
            GraphType::ListType(inner) => {
                self.write("[");
                self.graph_type(inner);
                self.write("]");
            }
            GraphType::NonNullType(inner) => {
                self.graph_type(inner);
                self.write("!");
            }
        }
    }
}

pub fn print_document(doc: &QueryDocument) -> String {
    let mut p = Printer::default();
    p.document(doc);
    p.buf
}

pub fn print_selection_set(ss: &SelectionSet) -> String {
    let mut p = Printer::default();
    p.selection_set(ss);
    p.buf
}

pub fn print_selection(sel: &Selection) -> String {
    let mut p = Printer::default();
    p.selection(sel);
    p.buf
}

pub fn print_field_node(field: &FieldNode) -> String {
    let mut p = Printer::default();
    p.field(field);
    p.buf
}

pub fn print_value(v: &GraphValue) -> String {
    let mut p = Printer::default();
    p.value(v);
    p.buf
}

pub fn print_type(t: &GraphType) -> String {
    let mut p = Printer::default();
    p.graph_type(t);
    p.buf
}

pub fn print_arguments(args: &[(String, GraphValue)]) -> String {
    let mut p = Printer::default();
    p.arguments(args);
    p.buf
}
