//! HTTP-facing helpers shared by REST modules: the typed operation builder
//! and RFC 9457 problem responses.

pub mod operation_builder;
pub mod problem;

pub use operation_builder::{
    ensure_schema, state, Missing, OpenApiRegistry, OperationBuilder, OperationSpec,
    ParamLocation, ParamSpec, Present, RequestBodySpec, ResponseSpec,
};
pub use problem::{Problem, ProblemResponse, ValidationError, APPLICATION_PROBLEM_JSON};
