//! Expression evaluation against a suspended stack frame.
//!
//! The expression is wrapped in a generated class with one public static
//! method whose formal parameters are the frame's visible bindings at their
//! declared types. The unit is compiled locally against the discovered
//! classpath, injected into the target's class loader, force-initialized
//! and invoked. Compiled bytes are cached under the frame's context
//! signature plus the expression text.

use super::*;

use uuid::Uuid;

/// Package every generated wrapper lives under.
const EVAL_PACKAGE: &str = "javelin.eval";
/// Name of the wrapper's single static method.
const EVAL_METHOD: &str = "eval";
/// Compiler-synthesized locals capturing enclosing state carry these
/// prefixes; they cannot be referenced from source.
const CAPTURE_PREFIXES: [&str; 2] = ["this$", "val$"];

pub(super) struct CompiledUnit {
    pub entry_class: String,
    pub classes: CompiledClasses,
}

#[derive(Debug, Clone)]
pub(super) struct EvalParam {
    pub name: String,
    pub declared_type: String,
    pub value: JdwpValue,
}

pub(super) struct EvalContext {
    pub params: Vec<EvalParam>,
    pub receiver: Option<ObjectId>,
}

impl EvalContext {
    /// Textual fingerprint of the parameter list; part of the compilation
    /// cache key. Identical signatures imply identical arity, order and
    /// declared types.
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|param| format!("{}:{}", param.name, param.declared_type))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Debugger {
    /// Evaluates a source-level expression in the context of
    /// `thread`/`frame_index`. Requires `configure_compiler_classpath` to
    /// have run on this session, so that no remote discovery call nests
    /// inside the evaluation invocation.
    pub fn evaluate(&self, thread: ThreadId, frame_index: usize, expression: &str) -> Result<String> {
        let compiler = self.configured_compiler()?;

        self.with_client(|client| {
            let frame = inspect::frame_at(client, thread, frame_index)?;
            let context = build_context(client, thread, &frame)?;
            let loader = select_loader(client, &frame, &context)?;

            let key = format!("{}\u{1}{}", context.signature(), expression);
            let cached = self.compile_cache.lock().get(&key).cloned();
            let unit = match cached {
                Some(unit) => unit,
                None => {
                    let class_name = compose_class_name();
                    let source = compose_source(&class_name, &context.params, expression);
                    tracing::debug!(%class_name, "compiling evaluation wrapper");
                    let classes = compiler.compile(&class_name, &source)?;
                    let unit = Arc::new(CompiledUnit {
                        entry_class: class_name,
                        classes,
                    });
                    self.compile_cache.lock().insert(key, unit.clone());
                    unit
                }
            };

            // The target keeps previously defined classes alive for its
            // whole lifetime, so a cache hit must not define again. The
            // marker is recorded only after a successful run: a retried
            // operation re-defines.
            let defined_key = (loader, unit.entry_class.clone());
            let needs_define = !self.defined_classes.lock().contains(&defined_key);

            let args: Vec<JdwpValue> =
                context.params.iter().map(|param| param.value.clone()).collect();
            let value = executor::execute_generated_class(
                client,
                thread,
                loader,
                &unit.entry_class,
                &unit.classes,
                EVAL_METHOD,
                &args,
                needs_define,
            )?;
            self.defined_classes.lock().insert(defined_key);

            inspect::render_value(client, &self.objects, &value)
        })
    }
}

/// Collects the frame's bindings: `_this` at the declared receiver type
/// when present, then every visible local that is an argument or not
/// compiler-synthesized.
pub(super) fn build_context(
    client: &mut JdwpClient,
    thread: ThreadId,
    frame: &javelin_jdwp::FrameInfo,
) -> Result<EvalContext> {
    let mut params = Vec::new();
    let mut receiver = None;

    if let Some((this_tag, this_id)) = client
        .frame_this_object(thread, frame.frame_id)
        .map_err(DebugError::from)?
    {
        let (_tag, type_id) = client
            .object_reference_type(this_id)
            .map_err(DebugError::from)?;
        let declared = declared_type_name(client, type_id).map_err(DebugError::from)?;
        params.push(EvalParam {
            name: "_this".to_string(),
            declared_type: declared,
            value: JdwpValue::Object {
                tag: this_tag,
                id: this_id,
            },
        });
        receiver = Some(this_id);
    }

    let vars = inspect::in_scope_variables(client, frame)?;
    let visible: Vec<_> = vars
        .into_iter()
        .filter(|var| var.name != "this")
        .filter(|var| {
            let is_arg = var.code_index == 0;
            is_arg || !is_capture_name(&var.name)
        })
        .collect();

    let slots: Vec<(u32, u8)> = visible
        .iter()
        .map(|var| (var.slot, var.signature.bytes().next().unwrap_or(b'L')))
        .collect();
    let values = client
        .frame_get_values(thread, frame.frame_id, &slots)
        .map_err(DebugError::from)?;

    for (var, value) in visible.into_iter().zip(values.into_iter()) {
        let type_name = javelin_jdwp::signature_to_type_name(&var.signature);
        params.push(EvalParam {
            name: var.name,
            declared_type: scrub_synthetic_name(&type_name).to_string(),
            value,
        });
    }

    Ok(EvalContext { params, receiver })
}

fn is_capture_name(name: &str) -> bool {
    CAPTURE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// The loader that will define the wrapper: the receiver's loader when the
/// frame has one, otherwise the defining loader of the frame's class. A
/// null (bootstrap) loader cannot receive a `defineClass` invocation.
fn select_loader(
    client: &mut JdwpClient,
    frame: &javelin_jdwp::FrameInfo,
    context: &EvalContext,
) -> Result<ObjectId> {
    if let Some(receiver) = context.receiver {
        let (_tag, type_id) = client
            .object_reference_type(receiver)
            .map_err(DebugError::from)?;
        let loader = client
            .reference_type_class_loader(type_id)
            .map_err(DebugError::from)?;
        if loader != 0 {
            return Ok(loader);
        }
    }

    let loader = client
        .reference_type_class_loader(frame.location.class_id)
        .map_err(DebugError::from)?;
    if loader != 0 {
        Ok(loader)
    } else {
        Err(DebugError::NoContextLoader)
    }
}

/// A fresh fully-qualified wrapper name. Uniqueness matters: target-side
/// class identity is by name, the target keeps old wrappers alive, and a
/// plain counter would collide across evaluator restarts.
pub(super) fn compose_class_name() -> String {
    format!("{EVAL_PACKAGE}.Expr{}", Uuid::new_v4().simple())
}

/// Renders the wrapper unit. The body casts through `Object` so every
/// expression type, primitive results included, can be returned uniformly.
pub(super) fn compose_source(class_name: &str, params: &[EvalParam], expression: &str) -> String {
    let simple_name = class_name.rsplit('.').next().unwrap_or(class_name);
    let formals = params
        .iter()
        .map(|param| format!("{} {}", param.declared_type, param.name))
        .collect::<Vec<_>>()
        .join(", ");
    let body = rewrite_this_token(expression.trim());

    let mut out = String::new();
    out.push_str("package ");
    out.push_str(EVAL_PACKAGE);
    out.push_str(";\n\n");
    out.push_str("public class ");
    out.push_str(simple_name);
    out.push_str(" {\n");
    out.push_str("    public static Object ");
    out.push_str(EVAL_METHOD);
    out.push('(');
    out.push_str(&formals);
    out.push_str(") {\n");
    out.push_str("        return (Object)(");
    out.push_str(&body);
    out.push_str(");\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

/// Replaces every standalone `this` token with `_this`. A lexical scan
/// keeps identifiers that merely contain the substring, and string and
/// character literals, untouched.
pub(super) fn rewrite_this_token(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 8);
    let mut chars = expr.chars().peekable();
    let mut in_str = false;
    let mut in_char = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_str || in_char {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if in_str && ch == '"' {
                in_str = false;
            } else if in_char && ch == '\'' {
                in_char = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_str = true;
                out.push(ch);
            }
            '\'' => {
                in_char = true;
                out.push(ch);
            }
            _ if is_ident_start(ch) => {
                let mut ident = String::new();
                ident.push(ch);
                while let Some(next) = chars.peek().copied() {
                    if is_ident_part(next) {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if ident == "this" {
                    out.push_str("_this");
                } else {
                    out.push_str(&ident);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, ty: &str) -> EvalParam {
        EvalParam {
            name: name.to_string(),
            declared_type: ty.to_string(),
            value: JdwpValue::null(),
        }
    }

    #[test]
    fn rewrite_replaces_standalone_this_only() {
        assert_eq!(rewrite_this_token("this"), "_this");
        assert_eq!(
            rewrite_this_token("this.getClass().getName()"),
            "_this.getClass().getName()"
        );
        assert_eq!(rewrite_this_token("thisOne + isthis"), "thisOne + isthis");
        assert_eq!(rewrite_this_token("a.this$0"), "a.this$0");
        assert_eq!(rewrite_this_token("x(this, this)"), "x(_this, _this)");
    }

    #[test]
    fn rewrite_leaves_literals_untouched() {
        assert_eq!(rewrite_this_token("\"this\""), "\"this\"");
        assert_eq!(
            rewrite_this_token("\"use this\" + this"),
            "\"use this\" + _this"
        );
        assert_eq!(rewrite_this_token("'t' + this"), "'t' + _this");
        assert_eq!(
            rewrite_this_token("\"escaped \\\" this\" + this"),
            "\"escaped \\\" this\" + _this"
        );
    }

    #[test]
    fn generated_class_names_are_unique_and_packaged() {
        let a = compose_class_name();
        let b = compose_class_name();
        assert_ne!(a, b);
        assert!(a.starts_with("javelin.eval.Expr"));
        assert!(!a.contains('-'));
    }

    #[test]
    fn source_wraps_expression_in_a_static_object_method() {
        let params = vec![param("_this", "demo.Svc"), param("count", "int")];
        let source = compose_source("javelin.eval.Expr123", &params, "this.total(count)");

        assert!(source.starts_with("package javelin.eval;"));
        assert!(source.contains("public class Expr123 {"));
        assert!(source.contains("public static Object eval(demo.Svc _this, int count)"));
        assert!(source.contains("return (Object)(_this.total(count));"));
    }

    #[test]
    fn source_with_no_bindings_has_empty_formals() {
        let source = compose_source("javelin.eval.Expr9", &[], "42 + 10");
        assert!(source.contains("public static Object eval()"));
        assert!(source.contains("return (Object)(42 + 10);"));
    }

    #[test]
    fn context_signature_reflects_names_and_declared_types_in_order() {
        let context = EvalContext {
            params: vec![param("_this", "demo.Svc"), param("request", "java.util.Map")],
            receiver: None,
        };
        assert_eq!(context.signature(), "_this:demo.Svc;request:java.util.Map");

        let reordered = EvalContext {
            params: vec![param("request", "java.util.Map"), param("_this", "demo.Svc")],
            receiver: None,
        };
        assert_ne!(context.signature(), reordered.signature());
    }

    #[test]
    fn capture_locals_are_recognized() {
        assert!(is_capture_name("this$0"));
        assert!(is_capture_name("val$total"));
        assert!(!is_capture_name("value"));
        assert!(!is_capture_name("thisOne"));
    }
}
