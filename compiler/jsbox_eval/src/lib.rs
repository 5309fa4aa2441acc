//! jsbox eval - capability-checked interpreter for compiled jsbox programs.
//!
//! This crate runs a [`Program`] produced by `jsbox_parse` over its own
//! value model, under a [`Capabilities`] policy chosen by the host.
//!
//! # Architecture
//!
//! - [`Realm`]: intrinsic prototypes and constructors, shared by any number
//!   of executions
//! - [`Capabilities`]: whitelisted globals and prototype members, value
//!   replacements, quota, audit, subscriptions
//! - [`Scope`] and [`Prop`]: lexical bindings and deferred references
//! - [`OpTable`]: one handler per opcode, shared by both drivers
//! - [`SyncDriver`] / [`AsyncDriver`]: blocking and suspending evaluation
//!
//! # Entry points
//!
//! [`execute`] runs a program to completion on the calling thread;
//! [`execute_async`] returns a future that suspends at `await` on pending
//! promises. Both produce the same results for programs without `await`.
//!
//! ```text
//! let context = Context::standard();
//! let program = jsbox_parse::compile("return 1 + 2")?;
//! let run = execute(&program, &[], &context)?;
//! assert_eq!(run.value, Value::Number(3.0));
//! ```

mod builtins;
pub mod capabilities;
pub mod errors;
pub mod interpreter;
pub mod operators;
pub mod prop;
pub mod realm;
pub mod scope;
pub mod value;

use std::rc::Rc;
use std::sync::Once;

use jsbox_ir::Program;
use jsbox_parse::ParseOptions;

pub use capabilities::{
    ArrayChange, AuditReport, Capabilities, CapabilitiesBuilder, Change, QuotaHook, Subscription,
};
pub use errors::{ControlAction, EvalError, EvalErrorKind, EvalResult};
pub use interpreter::{AsyncDriver, Closure, Evaluator, Interp, OpArgs, OpHandler, OpTable, SyncDriver};
pub use prop::{Operand, Prop, PropFlags};
pub use realm::{Intrinsics, Realm};
pub use scope::Scope;
pub use value::promise::{PromiseHandle, PromiseStatus};
pub use value::{Args, Obj, Value};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=jsbox_eval=debug` or `RUST_LOG=jsbox_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Everything an execution runs under apart from the program and its host
/// bindings.
#[derive(Clone, Debug)]
pub struct Context {
    realm: Rc<Realm>,
    caps: Capabilities,
    ops: OpTable,
    options: ParseOptions,
}

impl Context {
    pub fn new(realm: Rc<Realm>, caps: Capabilities) -> Self {
        Context {
            realm,
            caps,
            ops: OpTable::standard().clone(),
            options: ParseOptions::default(),
        }
    }

    /// A fresh realm with the standard capabilities.
    pub fn standard() -> Self {
        let realm = Rc::new(Realm::new());
        let caps = CapabilitiesBuilder::standard(&realm).build();
        Context::new(realm, caps)
    }

    #[must_use]
    pub fn with_ops(mut self, ops: OpTable) -> Self {
        self.ops = ops;
        self
    }

    /// Options for code compiled at run time (`Function(...)`).
    #[must_use]
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// A fresh interpreter with its own global object.
    pub fn interp(&self) -> Interp {
        Interp::new(
            Rc::clone(&self.realm),
            self.caps.clone(),
            self.ops.clone(),
            self.options,
        )
    }
}

/// Bindings a host places in scope for a program, visible as `let`
/// variables.
#[derive(Clone, Debug, Default)]
pub struct HostScope {
    bindings: Vec<(Rc<str>, Value)>,
}

impl HostScope {
    pub fn new() -> Self {
        HostScope::default()
    }

    #[must_use]
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bindings.push((name.into(), value.into()));
        self
    }
}

/// Outcome of a completed execution.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    /// Value of the top-level `return`, or the completion value of the last
    /// statement.
    pub value: Value,
    /// Whether the program ended with a top-level `return`.
    pub returned: bool,
    /// What the run touched, when the capabilities enable auditing.
    pub audit: Option<AuditReport>,
}

/// Host scopes nest in order; the program itself runs in a block scope
/// inside the last one.
fn program_scope(interp: &Interp, scopes: &[HostScope]) -> Scope {
    let mut scope = interp.root().clone();
    for host in scopes {
        scope = scope.with_bindings(host.bindings.iter().cloned());
    }
    scope.program_child()
}

fn finish(context: &Context, value: Value, returned: bool) -> Execution {
    let caps = &context.caps;
    tracing::debug!(ticks = caps.ticks(), returned, "execution finished");
    Execution {
        value,
        returned,
        audit: caps.is_audited().then(|| caps.audit_report()),
    }
}

/// Run `program` to completion on the current thread.
///
/// An `await` on a promise that cannot settle without suspending is an
/// error here; use [`execute_async`] for programs that wait on host work.
#[tracing::instrument(level = "trace", skip_all, fields(statements = program.body.len()))]
pub fn execute(program: &Program, scopes: &[HostScope], context: &Context) -> Result<Execution, EvalError> {
    context.caps.begin_run();
    let interp = context.interp();
    let scope = program_scope(&interp, scopes);
    let (value, returned) = SyncDriver::new(&interp).run_program(&program.body, &scope)?;
    Ok(finish(context, value, returned))
}

/// Run `program`, suspending at every `await` on a pending promise.
///
/// The future is `!Send`; drive it on a current-thread runtime or a
/// `LocalSet`.
pub async fn execute_async(
    program: &Program,
    scopes: &[HostScope],
    context: &Context,
) -> Result<Execution, EvalError> {
    context.caps.begin_run();
    let interp = context.interp();
    let scope = program_scope(&interp, scopes);
    let driver = AsyncDriver::new(interp);
    let (value, returned) = driver.run_program(&program.body, &scope).await?;
    Ok(finish(context, value, returned))
}
