//! Node.js built-in modules.

/// Modules provided by the Node.js runtime.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Package providing type declarations for the built-in modules.
pub const NODE_TYPES_PACKAGE: &str = "@types/node";

/// Returns `true` if `specifier` names a Node.js built-in module, including
/// subpaths such as `fs/promises` and the `node:` scheme.
#[must_use]
pub fn is_node_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let module = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.binary_search(&module).is_ok()
}
