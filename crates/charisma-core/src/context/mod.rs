//! Context assembly: gathering everything a turn needs to prompt the model.

mod assembler;

pub use assembler::ContextAssembler;
