//! Shared types for Viper.
//!
//! This crate defines the AST produced by `viper-lower` and executed by
//! `viper-eval`, together with its source rendering.

pub mod ast;
