use std::collections::hash_map::{Entry, HashMap};

use crate::{
    emit::EmitOptions,
    error::HgcError,
    types::{Argument, Document, RpcDeclaration, Type},
    utils::quote,
};

/// Maps IDL types to the C++ types used by the public input/output classes.
fn cpp_type(type_: Type) -> &'static str {
    match type_ {
        Type::Double        => "double",
        Type::Float         => "float",
        Type::Int32         => "int32_t",
        Type::Uint32        => "uint32_t",
        Type::String        => "std::string",
        Type::ExposedBuffer => "hermes::exposed_memory",
    }
}

/// Maps IDL types to the Mercury types used inside `MERCURY_GEN_PROC`.
fn mercury_type(type_: Type) -> &'static str {
    match type_ {
        Type::Double        => "double",
        Type::Float         => "float",
        Type::Int32         => "int32_t",
        Type::Uint32        => "uint32_t",
        Type::String        => "hg_const_string_t",
        Type::ExposedBuffer => "hg_bulk_t",
    }
}

/// Strings and buffers are taken by const reference, scalars by value.
fn param_type(type_: Type) -> String {
    match type_ {
        Type::String | Type::ExposedBuffer => format!("const {}&", cpp_type(type_)),
        _ => cpp_type(type_).to_string(),
    }
}

/// Expression converting member `m_<name>` into its Mercury representation.
fn to_mercury(arg: &Argument) -> String {
    let member = member_name(arg);
    match arg.type_ {
        Type::String        => format!("{}.c_str()", member),
        Type::ExposedBuffer => format!("hg_bulk_t({})", member),
        _                   => member,
    }
}

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor",
    "bool", "break", "case", "catch", "char", "char8_t", "char16_t", "char32_t",
    "class", "co_await", "co_return", "co_yield", "compl", "concept", "const",
    "const_cast", "consteval", "constexpr", "constinit", "continue", "decltype",
    "default", "delete", "do", "double", "dynamic_cast", "else", "enum",
    "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "import", "inline", "int", "long", "module", "mutable", "namespace",
    "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or", "or_eq",
    "private", "protected", "public", "register", "reinterpret_cast",
    "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this",
    "thread_local", "throw", "true", "try", "typedef", "typeid", "typename",
    "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t",
    "while", "xor", "xor_eq",
];

/// Names the header itself declares inside a descriptor struct or refers to
/// from there. An rpc or argument spelled like one of these would shadow it.
const GENERATED_NAMES: &[&str] = &[
    "input", "output", "self_type", "handle_type", "input_type", "output_type",
    "mercury_input_type", "mercury_output_type", "public_id", "mercury_id",
    "name", "requires_response", "mercury_in_proc_cb", "mercury_out_proc_cb",
    "hermes", "std", "int32_t", "uint32_t", "uint16_t", "hg_const_string_t",
    "hg_bulk_t", "hg_return_t", "ExecutionContext", "HG_GEN_PROC_NAME",
    "MERCURY_GEN_PROC",
];

pub(crate) fn is_cpp_keyword(s: &str) -> bool {
    CPP_KEYWORDS.contains(&s)
}

/// Suffixes C++ keywords and names taken by the generated code with an
/// underscore.
fn escape_cpp_name(s: &str) -> String {
    if is_cpp_keyword(s) || GENERATED_NAMES.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

fn field_name(arg: &Argument) -> String {
    escape_cpp_name(&arg.name)
}

fn member_name(arg: &Argument) -> String {
    format!("m_{}", arg.name)
}

fn setter_name(arg: &Argument) -> String {
    format!("set_{}", arg.name)
}

/// C++ identifiers declared in one scope of the header, each mapped to the
/// IDL name it was generated from.
struct Scope<'a> {
    label:    String,
    declared: HashMap<String, &'a str>,
}

impl<'a> Scope<'a> {
    fn new(label: String) -> Self {
        Scope { label, declared: HashMap::new() }
    }

    fn declare(&mut self, ident: String, source: &'a str) -> Result<(), HgcError> {
        match self.declared.entry(ident) {
            Entry::Occupied(entry) => Err(HgcError::EmitError(format!(
                "{}: {} and {} both map to the C++ name {}",
                self.label,
                quote(entry.get()),
                quote(source),
                quote(entry.key())
            ))),
            Entry::Vacant(entry) => {
                entry.insert(source);
                Ok(())
            }
        }
    }
}

/// Distinct IDL names can still collide once escaped (`delete` and
/// `delete_`), or a getter can land on another field's member (`m_x` and
/// `x`). Either would make the header fail to compile.
fn check_cpp_names(document: &Document, namespace: &str) -> Result<(), HgcError> {
    let mut structs = Scope::new(format!("namespace {}", namespace));
    for rpc in document {
        structs.declare(escape_cpp_name(&rpc.name), &rpc.name)?;

        let sides: [(Vec<&Argument>, bool); 2] = [
            (rpc.args.iter().collect(), false),
            (rpc.ret.iter().collect(), true),
        ];
        for (fields, with_setters) in sides {
            let mut class = Scope::new(format!("rpc {}", quote(&rpc.name)));
            for arg in fields {
                class.declare(field_name(arg), &arg.name)?;
                class.declare(member_name(arg), &arg.name)?;
                if with_setters {
                    class.declare(setter_name(arg), &arg.name)?;
                }
            }
        }
    }
    Ok(())
}

/// Compiles the whole document into a single C++ header with one
/// descriptor struct per rpc, in declaration order.
pub fn compile_document_to_cpp(document: &Document, options: &EmitOptions) -> Result<String, HgcError> {
    options.validate()?;
    check_cpp_names(document, &options.namespace)?;

    let guard = options.include_guard();
    let mut cpp_code: Vec<String> = Vec::new();

    cpp_code.push("// Generated by hgc from an RPC interface definition. Do not edit.".to_string());
    cpp_code.push(format!("#ifndef {}", guard));
    cpp_code.push(format!("#define {}", guard));
    cpp_code.push("".to_string());
    cpp_code.push("// C includes".to_string());
    cpp_code.push("#include <mercury.h>".to_string());
    cpp_code.push("#include <mercury_proc_string.h>".to_string());
    cpp_code.push("#include <mercury_macros.h>".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("// C++ includes".to_string());
    cpp_code.push("#include <string>".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("// hermes includes".to_string());
    cpp_code.push("#include <hermes.hpp>".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("#ifndef HG_GEN_PROC_NAME".to_string());
    cpp_code.push("#define HG_GEN_PROC_NAME(struct_type_name) \\".to_string());
    cpp_code.push("    hermes::detail::hg_proc_ ## struct_type_name".to_string());
    cpp_code.push("#endif".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("// forward declarations".to_string());
    cpp_code.push("namespace hermes { namespace detail {".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("template <typename ExecutionContext>".to_string());
    cpp_code.push("hg_return_t post_to_mercury(ExecutionContext* ctx);".to_string());
    cpp_code.push("".to_string());
    cpp_code.push("}} // namespace hermes::detail".to_string());
    cpp_code.push("".to_string());

    for (index, rpc) in document.iter().enumerate() {
        let public_id = u16::try_from(index)
            .ok()
            .and_then(|offset| options.first_public_id.checked_add(offset))
            .ok_or_else(|| {
                HgcError::EmitError(format!(
                    "Public id for rpc \"{}\" does not fit in 16 bits",
                    rpc.name
                ))
            })?;
        cpp_code.push(generate_rpc(rpc, public_id, &options.namespace));
    }

    cpp_code.push(format!("#endif // {}", guard));
    cpp_code.push("".to_string());

    Ok(cpp_code.join("\n"))
}

/// Generates the Mercury structs and the descriptor struct for one rpc.
fn generate_rpc(rpc: &RpcDeclaration, public_id: u16, namespace: &str) -> String {
    let name     = escape_cpp_name(&rpc.name);
    let in_type  = format!("{}_in_t", name);
    let out_type = format!("{}_out_t", name);
    let inputs: Vec<&Argument>  = rpc.args.iter().collect();
    let outputs: Vec<&Argument> = rpc.ret.iter().collect();

    let mut lines = Vec::new();
    lines.push("//==============================================================================".to_string());
    lines.push(format!("// definitions for {}::{}", namespace, name));

    if !inputs.is_empty() || !outputs.is_empty() {
        lines.push("namespace hermes { namespace detail {".to_string());
        lines.push("".to_string());
        lines.push("// Generate Mercury types and serialization functions (field names match".to_string());
        lines.push(format!(
            "// those defined by {}::input and {}::output). These definitions are",
            name, name
        ));
        lines.push("// internal and should not be used directly.".to_string());
        if !inputs.is_empty() {
            lines.push(generate_mercury_proc(&in_type, &inputs));
            lines.push("".to_string());
        }
        if !outputs.is_empty() {
            lines.push(generate_mercury_proc(&out_type, &outputs));
            lines.push("".to_string());
        }
        lines.push("}} // namespace hermes::detail".to_string());
        lines.push("".to_string());
    }

    let (mercury_in, in_cb)   = mercury_side(&inputs, &in_type);
    let (mercury_out, out_cb) = mercury_side(&outputs, &out_type);

    lines.push(format!("namespace {} {{", namespace));
    lines.push("".to_string());
    lines.push(format!("struct {} {{", name));
    lines.push("".to_string());
    lines.push("    // forward declarations of public input/output types for this RPC".to_string());
    lines.push("    class input;".to_string());
    lines.push("    class output;".to_string());
    lines.push("".to_string());
    lines.push("    // traits used so that the engine knows what to do with the RPC".to_string());
    lines.push(format!("    using self_type = {};", name));
    lines.push("    using handle_type = hermes::rpc_handle<self_type>;".to_string());
    lines.push("    using input_type = input;".to_string());
    lines.push("    using output_type = output;".to_string());
    lines.push(format!("    using mercury_input_type = {};", mercury_in));
    lines.push(format!("    using mercury_output_type = {};", mercury_out));
    lines.push("".to_string());
    lines.push("    // RPC public identifier".to_string());
    lines.push(format!("    constexpr static const uint16_t public_id = {};", public_id));
    lines.push("".to_string());
    lines.push("    // RPC internal Mercury identifier".to_string());
    lines.push("    constexpr static const uint16_t mercury_id = public_id;".to_string());
    lines.push("".to_string());
    lines.push("    // RPC name".to_string());
    lines.push(format!("    constexpr static const auto name = \"{}\";", rpc.name));
    lines.push("".to_string());
    lines.push("    // requires response?".to_string());
    lines.push(format!(
        "    constexpr static const auto requires_response = {};",
        rpc.requires_response()
    ));
    lines.push("".to_string());
    lines.push("    // Mercury callback to serialize input arguments".to_string());
    lines.push(format!("    constexpr static const auto mercury_in_proc_cb = {};", in_cb));
    lines.push("".to_string());
    lines.push("    // Mercury callback to serialize output arguments".to_string());
    lines.push(format!("    constexpr static const auto mercury_out_proc_cb = {};", out_cb));
    lines.push("".to_string());
    lines.push(generate_class("input", &in_type, &inputs, false));
    lines.push("".to_string());
    lines.push(generate_class("output", &out_type, &outputs, true));
    lines.push("};".to_string());
    lines.push("".to_string());
    lines.push(format!("}} // namespace {}", namespace));
    lines.push("".to_string());

    lines.join("\n")
}

/// The Mercury type and proc callback for one side of the call. An empty
/// side has neither.
fn mercury_side(fields: &[&Argument], type_name: &str) -> (String, String) {
    if fields.is_empty() {
        ("void".to_string(), "nullptr".to_string())
    } else {
        (
            format!("hermes::detail::{}", type_name),
            format!("HG_GEN_PROC_NAME({})", type_name),
        )
    }
}

fn generate_mercury_proc(type_name: &str, fields: &[&Argument]) -> String {
    let body: Vec<String> = fields
        .iter()
        .map(|arg| format!("        (({}) ({}))", mercury_type(arg.type_), field_name(arg)))
        .collect();
    format!("MERCURY_GEN_PROC({},\n{})", type_name, body.join("\n"))
}

/// Generates a public `input` or `output` class wrapping the Mercury struct.
/// Output classes also get setters, since handlers fill them in.
fn generate_class(class_name: &str, mercury_type_name: &str, fields: &[&Argument], with_setters: bool) -> String {
    let mercury_type_name = format!("hermes::detail::{}", mercury_type_name);
    let mut lines = Vec::new();

    lines.push(format!("    class {} {{", class_name));
    lines.push("".to_string());
    lines.push("        template <typename ExecutionContext>".to_string());
    lines.push("        friend hg_return_t hermes::detail::post_to_mercury(ExecutionContext*);".to_string());
    lines.push("".to_string());
    lines.push("    public:".to_string());

    if fields.is_empty() {
        lines.push(format!("        {}() {{ }}", class_name));
        lines.push("    };".to_string());
        return lines.join("\n");
    }

    let params: Vec<String> = fields
        .iter()
        .map(|arg| format!("{} {}", param_type(arg.type_), field_name(arg)))
        .collect();
    let indent = " ".repeat(8 + class_name.len() + 1);
    lines.push(format!(
        "        {}({}) :",
        class_name,
        params.join(&format!(",\n{}", indent))
    ));
    let inits: Vec<String> = fields
        .iter()
        .map(|arg| format!("            {}({})", member_name(arg), field_name(arg)))
        .collect();
    lines.push(format!("{} {{ }}", inits.join(",\n")));
    lines.push("".to_string());

    for arg in fields {
        lines.push(format!("        {}", cpp_type(arg.type_)));
        lines.push(format!("        {}() const {{", field_name(arg)));
        lines.push(format!("            return {};", member_name(arg)));
        lines.push("        }".to_string());
        lines.push("".to_string());

        if with_setters {
            lines.push("        void".to_string());
            lines.push(format!(
                "        {}({} {}) {{",
                setter_name(arg),
                param_type(arg.type_),
                field_name(arg)
            ));
            lines.push(format!("            {} = {};", member_name(arg), field_name(arg)));
            lines.push("        }".to_string());
            lines.push("".to_string());
        }
    }

    lines.push("        explicit".to_string());
    lines.push(format!("        {}(const {}& other) :", class_name, mercury_type_name));
    let from_mercury: Vec<String> = fields
        .iter()
        .map(|arg| format!("            {}(other.{})", member_name(arg), field_name(arg)))
        .collect();
    lines.push(format!("{} {{ }}", from_mercury.join(",\n")));
    lines.push("".to_string());

    lines.push("        explicit".to_string());
    lines.push(format!("        operator {}() {{", mercury_type_name));
    let to_fields: Vec<String> = fields.iter().map(|arg| to_mercury(arg)).collect();
    lines.push(format!("            return {{{}}};", to_fields.join(", ")));
    lines.push("        }".to_string());
    lines.push("".to_string());

    lines.push("    private:".to_string());
    for arg in fields {
        lines.push(format!("        {} {};", cpp_type(arg.type_), member_name(arg)));
    }
    lines.push("    };".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    const SEND_FILE: &str = r#"
        rpc send_file {
            arguments {
                string pathname;
                exposed_buffer buffers;
            };
            returns { int32 retval; };
        };
    "#;

    fn options(namespace: &str, first_public_id: u16) -> EmitOptions {
        EmitOptions {
            namespace: namespace.to_string(),
            first_public_id,
            include_guard: None,
        }
    }

    #[test]
    fn test_gen_cpp_send_file() {
        let document = compile(SEND_FILE).unwrap();
        let cpp = compile_document_to_cpp(&document, &options("example_rpcs", 43)).unwrap();

        assert!(cpp.starts_with("// Generated by hgc"));
        assert!(cpp.contains("#ifndef EXAMPLE_RPCS_HPP\n#define EXAMPLE_RPCS_HPP\n"));
        assert!(cpp.contains(
            "MERCURY_GEN_PROC(send_file_in_t,\n        ((hg_const_string_t) (pathname))\n        ((hg_bulk_t) (buffers)))"
        ));
        assert!(cpp.contains("MERCURY_GEN_PROC(send_file_out_t,\n        ((int32_t) (retval)))"));
        assert!(cpp.contains("namespace example_rpcs {\n\nstruct send_file {"));
        assert!(cpp.contains("constexpr static const uint16_t public_id = 43;"));
        assert!(cpp.contains("constexpr static const auto name = \"send_file\";"));
        assert!(cpp.contains("constexpr static const auto requires_response = true;"));
        assert!(cpp.contains(
            "        input(const std::string& pathname,\n              const hermes::exposed_memory& buffers) :\n            m_pathname(pathname),\n            m_buffers(buffers) { }"
        ));
        assert!(cpp.contains("            return {m_pathname.c_str(), hg_bulk_t(m_buffers)};"));
        assert!(cpp.contains("        set_retval(int32_t retval) {"));
        assert!(cpp.trim_end().ends_with("#endif // EXAMPLE_RPCS_HPP"));
    }

    #[test]
    fn test_gen_cpp_ids_follow_declaration_order() {
        let document = compile("rpc a { }; rpc b { }; rpc c { };").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 10)).unwrap();

        let a = cpp.find("struct a {").unwrap();
        let b = cpp.find("struct b {").unwrap();
        let c = cpp.find("struct c {").unwrap();
        assert!(a < b && b < c);
        assert!(cpp.contains("public_id = 10;"));
        assert!(cpp.contains("public_id = 11;"));
        assert!(cpp.contains("public_id = 12;"));
    }

    #[test]
    fn test_gen_cpp_rpc_without_arguments_or_return() {
        let document = compile("rpc shutdown { };").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();

        assert!(!cpp.contains("MERCURY_GEN_PROC(shutdown"));
        assert!(cpp.contains("using mercury_input_type = void;"));
        assert!(cpp.contains("constexpr static const auto mercury_in_proc_cb = nullptr;"));
        assert!(cpp.contains("constexpr static const auto requires_response = false;"));
        assert!(cpp.contains("        input() { }"));
        assert!(cpp.contains("        output() { }"));
    }

    #[test]
    fn test_gen_cpp_escapes_keywords() {
        let document = compile("rpc lookup { arguments { uint32 class; }; };").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();

        assert!(cpp.contains("((uint32_t) (class_))"));
        assert!(cpp.contains("        input(uint32_t class_) :\n            m_class(class_) { }"));
    }

    #[test]
    fn test_gen_cpp_escapes_rpc_name() {
        let document = compile("rpc delete { arguments { string path; }; };").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();

        assert!(cpp.contains("struct delete_ {"));
        assert!(cpp.contains("MERCURY_GEN_PROC(delete__in_t,"));
        assert!(cpp.contains("constexpr static const auto name = \"delete\";"));
    }

    #[test]
    fn test_gen_cpp_escapes_full_keyword_list() {
        let document = compile(
            "rpc stat { arguments { uint32 typeid; uint32 static_assert; }; returns { int32 output; }; };",
        )
        .unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();

        assert!(cpp.contains("((uint32_t) (typeid_))"));
        assert!(cpp.contains("((uint32_t) (static_assert_))"));
        assert!(cpp.contains("        static_assert_() const {"));
        assert!(cpp.contains("        output_() const {"));
        assert!(cpp.contains("        set_output(int32_t output_) {"));
        assert!(!cpp.contains("        output() const {"));
    }

    #[test]
    fn test_gen_cpp_escapes_names_used_by_the_descriptor() {
        let document = compile("rpc input { arguments { int32 input; string name; }; };").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();

        assert!(cpp.contains("struct input_ {"));
        assert!(cpp.contains("using self_type = input_;"));
        assert!(cpp.contains("constexpr static const auto name = \"input\";"));
        assert!(cpp.contains("        input_() const {"));
        assert!(cpp.contains("        name_() const {"));
        assert!(cpp.contains("    class input {"));
    }

    #[test]
    fn test_gen_cpp_rejects_clashing_rpc_names() {
        let document = compile("rpc delete { }; rpc delete_ { };").unwrap();
        let err = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap_err();
        match err {
            HgcError::EmitError(msg) => assert_eq!(
                msg,
                "namespace rpcs: \"delete\" and \"delete_\" both map to the C++ name \"delete_\""
            ),
            other => panic!("expected an emit error, got {:?}", other),
        }
    }

    #[test]
    fn test_gen_cpp_rejects_clashing_argument_names() {
        let document = compile("rpc a { arguments { uint32 class; uint32 class_; }; };").unwrap();
        let err = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap_err();
        assert!(matches!(err, HgcError::EmitError(msg) if msg.contains("\"class_\"") && msg.starts_with("rpc \"a\"")));
    }

    #[test]
    fn test_gen_cpp_rejects_getter_named_like_a_member() {
        let document = compile("rpc a { arguments { uint32 x; uint32 m_x; }; };").unwrap();
        let err = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap_err();
        assert!(matches!(err, HgcError::EmitError(msg) if msg.ends_with("the C++ name \"m_x\"")));

        // Inputs and outputs are separate classes.
        let document = compile("rpc a { arguments { uint32 x; }; returns { uint32 m_x; }; };").unwrap();
        assert!(compile_document_to_cpp(&document, &options("rpcs", 1)).is_ok());
    }

    #[test]
    fn test_gen_cpp_public_id_overflow() {
        let document = compile("rpc a { }; rpc b { };").unwrap();
        let err = compile_document_to_cpp(&document, &options("rpcs", u16::MAX)).unwrap_err();
        assert!(matches!(err, HgcError::EmitError(msg) if msg.contains("\"b\"")));
    }

    #[test]
    fn test_gen_cpp_empty_document() {
        let document = compile("# no rpcs yet\n").unwrap();
        let cpp = compile_document_to_cpp(&document, &options("rpcs", 1)).unwrap();
        assert!(!cpp.contains("struct "));
        assert!(cpp.contains("#endif // RPCS_HPP"));
    }
}
