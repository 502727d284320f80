//! Proxy source synthesis
//!
//! Renders a resolved target and its method surface into one Veil source
//! unit. The generated class:
//!
//! - extends `veil.ProxyBase` (interface and sealed targets) or the target
//!   class itself (subclass targets, which declare their own handler field)
//! - holds one `private static final Method` field per forwarded method,
//!   resolved once by the static initializer
//! - forwards every method to `handler.invoke(this, method, args)`, casting
//!   the result to the declared return type and wrapping checked throwables
//!   in `UndeclaredThrowableException`
//!
//! Runtime and builtin types are always written through the runtime package
//! (`veil.Method`, `veil.String`, `veil.Error`) so that types declared in the
//! target's package never shadow them.

use rustc_hash::FxHashMap;

use crate::proxy::resolver::{MethodSurface, ResolvedTarget};
use crate::vm::builtins::{self, HANDLER_FIELD, INVOCATION_HANDLER, METHOD, PROXY_BASE, RUNTIME_PACKAGE};
use crate::vm::types::{MethodRef, TypeDef, TypeRef};

/// Prefix of every generated type's simple name
pub const PROXY_NAME_PREFIX: &str = "$Proxy";

/// Extension of Veil source units
pub const SOURCE_EXTENSION: &str = "veil";

/// A synthesized source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// Fully qualified name of the generated type
    pub type_name: String,
    /// `$Proxy<N>.veil`
    pub file_name: String,
    pub source: String,
}

impl GeneratedUnit {
    pub fn simple_name(&self) -> &str {
        self.type_name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.type_name)
    }
}

/// Indenting line writer
struct SourceWriter {
    out: String,
    indent: usize,
}

impl SourceWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write `text {` and indent
    fn open(&mut self, text: &str) {
        self.line(&format!("{} {{", text));
        self.indent += 1;
    }

    /// Dedent and write `}` followed by `tail`
    fn close_with(&mut self, tail: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("}}{}", tail));
    }

    fn close(&mut self) {
        self.close_with("");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Builtin type spelled through the runtime package
fn runtime(simple: &str) -> String {
    format!("{}.{}", RUNTIME_PACKAGE, simple)
}

/// Source spelling of a type; implicit builtins go through the runtime package
fn spell(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) if builtins::implicit_type(name).is_some() => runtime(name),
        TypeRef::Array(element) => format!("{}[]", spell(element)),
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Array initializer text
fn initializer(items: &[String]) -> String {
    if items.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", items.join(", "))
    }
}

/// A forwarded method and the static field holding its handle
struct Forward<'s> {
    method: &'s MethodRef,
    field: String,
}

/// Assign handle field names: the method name suffixed with its overload index
fn forwards(surface: &MethodSurface) -> Vec<Forward<'_>> {
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
    surface
        .iter()
        .map(|method| {
            let index = seen.entry(method.name.as_str()).or_insert(0);
            let field = format!("{}${}", method.name, index);
            *index += 1;
            Forward { method, field }
        })
        .collect()
}

/// Handler field name for a subclass proxy; avoids the target's own fields
fn subclass_handler_field(class: &TypeDef) -> String {
    let taken = |name: &str| class.field_layout().iter().any(|f| f == name);
    if !taken(HANDLER_FIELD) {
        return HANDLER_FIELD.to_string();
    }
    let mut n = 0;
    loop {
        let candidate = format!("{}$proxy{}", HANDLER_FIELD, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Render the proxy source for `target` as `$Proxy<id>`
pub fn render(target: &ResolvedTarget, surface: &MethodSurface, id: u64) -> GeneratedUnit {
    let simple_name = format!("{}{}", PROXY_NAME_PREFIX, id);
    let package = target.package();
    let type_name = match package {
        Some(package) => format!("{}.{}", package, simple_name),
        None => simple_name.clone(),
    };

    let (header, handler_field) = match target {
        ResolvedTarget::Interfaces(types) => {
            let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
            (
                format!(
                    "public final class {} extends {} implements {}",
                    simple_name,
                    PROXY_BASE,
                    names.join(", ")
                ),
                None,
            )
        }
        ResolvedTarget::Sealed(_) => (
            format!("public final class {} extends {}", simple_name, PROXY_BASE),
            None,
        ),
        ResolvedTarget::Subclass(class) => (
            format!("public final class {} extends {}", simple_name, class.name),
            Some(subclass_handler_field(class)),
        ),
    };
    let handler = handler_field.as_deref().unwrap_or(HANDLER_FIELD);
    let forwards = forwards(surface);

    let mut w = SourceWriter::new();
    if let Some(package) = package {
        w.line(&format!("package {};", package));
        w.blank();
    }

    w.open(&header);
    if let Some(field) = &handler_field {
        w.line(&format!("private final {} {};", INVOCATION_HANDLER, field));
    }
    for forward in &forwards {
        w.line(&format!("private static final {} {};", METHOD, forward.field));
    }
    w.blank();

    render_constructor(&mut w, &simple_name, handler_field.as_deref());
    if !forwards.is_empty() {
        w.blank();
        render_static_init(&mut w, &simple_name, &forwards);
    }
    for forward in &forwards {
        w.blank();
        render_forward(&mut w, &simple_name, handler, forward);
    }
    w.close();

    GeneratedUnit {
        type_name,
        file_name: format!("{}.{}", simple_name, SOURCE_EXTENSION),
        source: w.finish(),
    }
}

fn render_constructor(w: &mut SourceWriter, simple_name: &str, own_field: Option<&str>) {
    w.open(&format!("public {}({} handler)", simple_name, INVOCATION_HANDLER));
    match own_field {
        Some(field) => {
            w.line("super();");
            w.line(&format!("this.{} = handler;", field));
        }
        None => w.line("super(handler);"),
    }
    w.close();
}

fn render_static_init(w: &mut SourceWriter, simple_name: &str, forwards: &[Forward<'_>]) {
    w.open("static");
    w.open("try");
    for forward in forwards {
        let method = forward.method;
        let params: Vec<String> = method.params.iter().map(|p| quote(&p.to_string())).collect();
        w.line(&format!(
            "{}.{} = {}.find({}, {}, new {}[] {});",
            simple_name,
            forward.field,
            METHOD,
            quote(&method.declaring_type),
            quote(&method.name),
            runtime(builtins::STRING),
            initializer(&params)
        ));
    }
    w.close_with(&format!(" catch ({} e) {{", runtime("NoSuchMethodException")));
    w.indent += 1;
    w.line(&format!("throw new {}(e.getMessage());", runtime("NoSuchMethodError")));
    w.close_with(&format!(" catch ({} e) {{", runtime("ClassNotFoundException")));
    w.indent += 1;
    w.line(&format!("throw new {}(e.getMessage());", runtime("NoClassDefFoundError")));
    w.close();
    w.close();
}

fn render_forward(w: &mut SourceWriter, simple_name: &str, handler: &str, forward: &Forward<'_>) {
    let method = forward.method;
    let params: Vec<String> = method
        .params
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("{} p{}", spell(ty), i))
        .collect();
    let args: Vec<String> = (0..method.params.len()).map(|i| format!("p{}", i)).collect();
    let call = format!(
        "this.{}.invoke(this, {}.{}, new {}[] {})",
        handler,
        simple_name,
        forward.field,
        runtime(builtins::OBJECT),
        initializer(&args)
    );

    w.open(&format!(
        "public final {} {}({})",
        spell(&method.return_type),
        method.name,
        params.join(", ")
    ));
    w.open("try");
    match &method.return_type {
        TypeRef::Void => w.line(&format!("{};", call)),
        ty if *ty == TypeRef::object() => w.line(&format!("return {};", call)),
        ty => w.line(&format!("return ({}) {};", spell(ty), call)),
    }
    w.close_with(&format!(
        " catch ({} | {} e) {{",
        runtime("RuntimeException"),
        runtime("Error")
    ));
    w.indent += 1;
    w.line("throw e;");
    w.close_with(&format!(" catch ({} e) {{", runtime(builtins::THROWABLE)));
    w.indent += 1;
    w.line(&format!("throw new {}(e);", runtime("UndeclaredThrowableException")));
    w.close();
    w.close();
}
