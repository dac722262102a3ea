//! SWC-backed compiler.
//!
//! Strips TypeScript, lowers JSX with the automatic React runtime and emits
//! JavaScript, optionally minified and with a source map.

#![allow(clippy::default_trait_access)]

use super::{CompileOptions, CompileOutput, Compiler, CompilerError};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SwcCompiler {
    _private: (),
}

impl SwcCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn is_typescript(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "ts" | "tsx" | "mts" | "cts"))
    }

    fn is_jsx(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jsx" | "tsx"))
    }
}

impl Compiler for SwcCompiler {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn compile(&self, content: &str, options: &CompileOptions) -> Result<CompileOutput, CompilerError> {
        if content.is_empty() {
            return Ok(CompileOutput::new(""));
        }

        let is_ts = Self::is_typescript(&options.path);
        let is_jsx = Self::is_jsx(&options.path);
        compile_with_swc(options, content, is_ts, is_jsx)
    }
}

fn es_version(target: &str) -> swc_ecma_ast::EsVersion {
    use swc_ecma_ast::EsVersion;

    match target.to_ascii_lowercase().as_str() {
        "es2015" | "es6" => EsVersion::Es2015,
        "es2016" => EsVersion::Es2016,
        "es2017" => EsVersion::Es2017,
        "es2018" => EsVersion::Es2018,
        "es2019" => EsVersion::Es2019,
        "es2021" => EsVersion::Es2021,
        "es2022" | "es2023" | "es2024" => EsVersion::Es2022,
        "esnext" => EsVersion::EsNext,
        _ => EsVersion::Es2020,
    }
}

fn compile_with_swc(
    options: &CompileOptions,
    source: &str,
    is_ts: bool,
    is_jsx: bool,
) -> Result<CompileOutput, CompilerError> {
    use swc_common::{
        comments::SingleThreadedComments, errors::Handler, sync::Lrc, FileName, Globals, Mark,
        SourceMap, GLOBALS,
    };
    use swc_ecma_ast::Program;
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
    use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
    use swc_ecma_transforms_react::{react, Options as ReactOptions, Runtime};
    use swc_ecma_transforms_typescript::strip;
    use swc_ecma_visit::FoldWith;

    let cm: Lrc<SourceMap> = Default::default();
    let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));

    let filename = options
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.js");
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let syntax = if is_ts {
        Syntax::Typescript(TsSyntax {
            tsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    };

    let target = es_version(&options.target);
    let comments = SingleThreadedComments::default();

    let lexer = Lexer::new(syntax, target, StringInput::from(&*fm), Some(&comments));
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| {
        let kind = format!("{:?}", e.kind());
        e.into_diagnostic(&handler).emit();
        CompilerError::parse_error(format!("Failed to parse {filename}: {kind}"))
    })?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(CompilerError::parse_error(errors.join(", ")));
    }

    let output = GLOBALS.set(&Globals::default(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Module(module);
        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, is_ts));

        if is_ts {
            program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
        }

        let mut module = match program {
            Program::Module(m) => m,
            Program::Script(s) => swc_ecma_ast::Module {
                span: s.span,
                body: s
                    .body
                    .into_iter()
                    .map(swc_ecma_ast::ModuleItem::Stmt)
                    .collect(),
                shebang: s.shebang,
            },
        };

        if is_jsx {
            let react_options = ReactOptions {
                runtime: Some(Runtime::Automatic),
                import_source: Some("react".to_string()),
                ..Default::default()
            };
            module = module.fold_with(&mut react(
                cm.clone(),
                Some(&comments),
                react_options,
                top_level_mark,
                unresolved_mark,
            ));
        }

        module = module.fold_with(&mut hygiene());
        module = module.fold_with(&mut fixer(Some(&comments)));
        module
    });

    let mut buf = Vec::new();
    let mut src_map_buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, Some(&mut src_map_buf));
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default()
                .with_minify(options.minify)
                .with_target(target),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };
        emitter
            .emit_module(&output)
            .map_err(|e| CompilerError::transform_error(format!("Failed to emit: {e}")))?;
    }

    let code = String::from_utf8(buf)
        .map_err(|e| CompilerError::transform_error(format!("Invalid UTF-8 output: {e}")))?;
    let mut result = CompileOutput::new(code);

    if options.source_maps {
        let srcmap = cm.build_source_map(&src_map_buf);
        let mut map_buf = Vec::new();
        srcmap.to_writer(&mut map_buf).map_err(|e| {
            CompilerError::transform_error(format!("Failed to write source map: {e}"))
        })?;
        let map = String::from_utf8(map_buf)
            .map_err(|e| CompilerError::transform_error(format!("Invalid source map: {e}")))?;
        result = result.with_map(map);
    }

    Ok(result)
}
