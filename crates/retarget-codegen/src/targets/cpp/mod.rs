//! C++ target (C++20 by default), built with CMake.

pub mod ast;
mod emit;
mod runtime;
mod semantic;
mod transform;

pub use emit::CppEmitter;
pub use transform::CppTransformer;

use crate::options::{FlagReader, GenerateOptions};
use crate::traits::{BuildFile, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Standard {
    Cpp17,
    Cpp20,
    Cpp23,
}

impl Standard {
    fn parse(value: &str) -> Self {
        match value {
            "c++17" => Standard::Cpp17,
            "c++23" => Standard::Cpp23,
            _ => Standard::Cpp20,
        }
    }

    /// The number CMake's `CMAKE_CXX_STANDARD` expects.
    pub fn year(self) -> u32 {
        match self {
            Standard::Cpp17 => 17,
            Standard::Cpp20 => 20,
            Standard::Cpp23 => 23,
        }
    }

    /// `std::format`, `<bit>` rotations and `contains` are available.
    pub fn is_cpp20(self) -> bool {
        self >= Standard::Cpp20
    }
}

/// Options understood by the C++ target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppOptions {
    /// Wrap declarations in `namespace <name> { }`.
    pub namespace: Option<String>,
    pub standard: Standard,
    pub doc_comments: bool,
    pub framework_stubs: bool,
    /// Emit `co_await`/`co_return` coroutines; otherwise async code runs synchronously.
    pub use_coroutines: bool,
}

impl Default for CppOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            standard: Standard::Cpp20,
            doc_comments: true,
            framework_stubs: true,
            use_coroutines: false,
        }
    }
}

pub struct CppTarget;

pub static CPP_TARGET: CppTarget = CppTarget;

impl Target for CppTarget {
    type Options = CppOptions;
    type Unit = ast::TranslationUnit;
    type Transformer = CppTransformer;
    type Emitter = CppEmitter;

    fn name(&self) -> &'static str {
        "cpp"
    }

    fn extension(&self) -> &'static str {
        "cpp"
    }

    fn description(&self) -> &'static str {
        "C++20 source file with a CMakeLists.txt"
    }

    fn default_options(&self) -> GenerateOptions {
        let defaults = CppOptions::default();
        GenerateOptions::new()
            .with_flag("namespace", serde_json::Value::Null)
            .with_flag("standard", "c++20")
            .with_flag("docComments", defaults.doc_comments)
            .with_flag("frameworkStubs", defaults.framework_stubs)
            .with_flag("useCoroutines", defaults.use_coroutines)
    }

    fn configure(&self, flags: &mut FlagReader<'_>) -> CppOptions {
        let defaults = CppOptions::default();
        let standard = flags.choice("standard", &["c++17", "c++20", "c++23"], "c++20");
        let standard = Standard::parse(&standard);
        let mut use_coroutines = flags.bool("useCoroutines", defaults.use_coroutines);
        if use_coroutines && !standard.is_cpp20() {
            tracing::warn!("coroutines need c++20; generating synchronous code");
            use_coroutines = false;
        }
        CppOptions {
            namespace: flags.opt_string("namespace").filter(|name| !name.is_empty()),
            standard,
            doc_comments: flags.bool("docComments", defaults.doc_comments),
            framework_stubs: flags.bool("frameworkStubs", defaults.framework_stubs),
            use_coroutines,
        }
    }

    fn transformer(&self, options: &CppOptions) -> CppTransformer {
        CppTransformer::new(options.clone())
    }

    fn emitter(&self, _options: &CppOptions, indent: &str) -> CppEmitter {
        CppEmitter::new(indent)
    }

    fn build_files(&self, options: &CppOptions, unit: &ast::TranslationUnit) -> Vec<BuildFile> {
        vec![BuildFile {
            path: "CMakeLists.txt".to_string(),
            contents: cmake_lists(options, unit.has_main()),
        }]
    }
}

fn cmake_lists(options: &CppOptions, has_main: bool) -> String {
    let project = options.namespace.as_deref().unwrap_or("generated");
    let target = if has_main {
        format!("add_executable({project} ${{SOURCES}})")
    } else {
        format!("add_library({project} STATIC ${{SOURCES}})")
    };
    format!(
        "cmake_minimum_required(VERSION 3.20)
project({project} LANGUAGES CXX)

set(CMAKE_CXX_STANDARD {year})
set(CMAKE_CXX_STANDARD_REQUIRED ON)
set(CMAKE_CXX_EXTENSIONS OFF)

file(GLOB SOURCES CONFIGURE_DEPENDS *.cpp)
{target}
",
        year = options.standard.year(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmake_lists_follows_standard_and_entry_point() {
        let options = CppOptions {
            namespace: Some("cipher".to_string()),
            standard: Standard::Cpp17,
            ..CppOptions::default()
        };
        let exe = cmake_lists(&options, true);
        assert!(exe.contains("project(cipher LANGUAGES CXX)"));
        assert!(exe.contains("set(CMAKE_CXX_STANDARD 17)"));
        assert!(exe.contains("add_executable(cipher ${SOURCES})"));
        let lib = cmake_lists(&CppOptions::default(), false);
        assert!(lib.contains("add_library(generated STATIC ${SOURCES})"));
        assert!(lib.contains("set(CMAKE_CXX_STANDARD 20)"));
    }

    #[test]
    fn test_coroutines_need_cpp20() {
        let options = GenerateOptions::new()
            .with_flag("standard", "c++17")
            .with_flag("useCoroutines", true);
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(&options, &mut warnings);
        let typed = CPP_TARGET.configure(&mut reader);
        reader.finish();
        assert_eq!(typed.standard, Standard::Cpp17);
        assert!(!typed.use_coroutines);
    }

    #[test]
    fn test_unknown_standard_falls_back() {
        let options = GenerateOptions::new().with_flag("standard", "c++98");
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(&options, &mut warnings);
        let typed = CPP_TARGET.configure(&mut reader);
        reader.finish();
        assert_eq!(typed.standard, Standard::Cpp20);
        assert_eq!(warnings.len(), 1);
    }
}
