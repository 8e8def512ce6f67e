//! C# 11 target (.NET 8).

pub mod ast;
mod emit;
mod runtime;
mod semantic;
mod transform;

pub use emit::CSharpEmitter;
pub use transform::CSharpTransformer;

use crate::options::{FlagReader, GenerateOptions};
use crate::traits::{BuildFile, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStyle {
    /// `async Task<T>` methods.
    Task,
    /// Drop `async` and `await`; the program runs synchronously.
    None,
}

/// Options understood by the C# target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSharpOptions {
    pub namespace: String,
    /// Static class holding top-level functions and variables.
    pub class_name: String,
    /// Spell out inferred local types instead of `var`.
    pub explicit_types: bool,
    pub doc_comments: bool,
    pub framework_stubs: bool,
    /// `#nullable enable` and `T?` annotations.
    pub nullable: bool,
    pub async_style: AsyncStyle,
}

impl Default for CSharpOptions {
    fn default() -> Self {
        Self {
            namespace: "Generated".to_string(),
            class_name: "Program".to_string(),
            explicit_types: true,
            doc_comments: true,
            framework_stubs: true,
            nullable: true,
            async_style: AsyncStyle::Task,
        }
    }
}

pub struct CSharpTarget;

pub static CSHARP_TARGET: CSharpTarget = CSharpTarget;

impl Target for CSharpTarget {
    type Options = CSharpOptions;
    type Unit = ast::CompilationUnit;
    type Transformer = CSharpTransformer;
    type Emitter = CSharpEmitter;

    fn name(&self) -> &'static str {
        "csharp"
    }

    fn extension(&self) -> &'static str {
        "cs"
    }

    fn description(&self) -> &'static str {
        "C# 11 source file with a .csproj"
    }

    fn default_options(&self) -> GenerateOptions {
        let defaults = CSharpOptions::default();
        GenerateOptions::new()
            .with_flag("namespace", defaults.namespace)
            .with_flag("className", defaults.class_name)
            .with_flag("explicitTypes", defaults.explicit_types)
            .with_flag("docComments", defaults.doc_comments)
            .with_flag("frameworkStubs", defaults.framework_stubs)
            .with_flag("nullable", defaults.nullable)
            .with_flag("asyncStyle", "task")
    }

    fn configure(&self, flags: &mut FlagReader<'_>) -> CSharpOptions {
        let defaults = CSharpOptions::default();
        let async_style = match flags.choice("asyncStyle", &["task", "none"], "task").as_str() {
            "none" => AsyncStyle::None,
            _ => AsyncStyle::Task,
        };
        CSharpOptions {
            namespace: flags.string("namespace", &defaults.namespace),
            class_name: flags.string("className", &defaults.class_name),
            explicit_types: flags.bool("explicitTypes", defaults.explicit_types),
            doc_comments: flags.bool("docComments", defaults.doc_comments),
            framework_stubs: flags.bool("frameworkStubs", defaults.framework_stubs),
            nullable: flags.bool("nullable", defaults.nullable),
            async_style,
        }
    }

    fn transformer(&self, options: &CSharpOptions) -> CSharpTransformer {
        CSharpTransformer::new(options.clone())
    }

    fn emitter(&self, _options: &CSharpOptions, indent: &str) -> CSharpEmitter {
        CSharpEmitter::new(indent)
    }

    fn build_files(&self, options: &CSharpOptions, unit: &ast::CompilationUnit) -> Vec<BuildFile> {
        vec![BuildFile {
            path: format!("{}.csproj", options.namespace),
            contents: project_file(options, unit.has_main),
        }]
    }
}

fn project_file(options: &CSharpOptions, has_main: bool) -> String {
    let output_type = if has_main { "Exe" } else { "Library" };
    let nullable = if options.nullable { "enable" } else { "disable" };
    format!(
        r#"<Project Sdk="Microsoft.NET.Sdk">

  <PropertyGroup>
    <OutputType>{output_type}</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <LangVersion>11</LangVersion>
    <Nullable>{nullable}</Nullable>
    <RootNamespace>{namespace}</RootNamespace>
    <AllowUnsafeBlocks>false</AllowUnsafeBlocks>
  </PropertyGroup>

  <ItemGroup>
    <PackageReference Include="Microsoft.CSharp" Version="4.7.0" />
  </ItemGroup>

</Project>
"#,
        namespace = options.namespace,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_file_matches_entry_point() {
        let options = CSharpOptions::default();
        let exe = project_file(&options, true);
        assert!(exe.contains("<OutputType>Exe</OutputType>"));
        assert!(exe.contains("<RootNamespace>Generated</RootNamespace>"));
        assert!(project_file(&options, false).contains("<OutputType>Library</OutputType>"));
    }

    #[test]
    fn test_bad_async_style_falls_back() {
        let options = GenerateOptions::new().with_flag("asyncStyle", "threads");
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(&options, &mut warnings);
        let typed = CSHARP_TARGET.configure(&mut reader);
        reader.finish();
        assert_eq!(typed.async_style, AsyncStyle::Task);
        assert_eq!(warnings.len(), 1);
    }
}
