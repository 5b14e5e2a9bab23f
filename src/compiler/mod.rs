//! 编译模块：将原始签名编译为可执行的匹配模式
pub mod compiler;
pub mod pattern;

pub use self::compiler::{CompiledSignature, CompiledSignatures, SignatureCompiler};
pub use self::pattern::{ParsedPattern, PatternParser};
