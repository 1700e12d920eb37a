//! Whole-workspace analysis over on-disk fixtures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{parse_source, v6_lockfile, workspace};
use tsdeps_resolver::{
    Analysis, Dependency, DependencyKind, DiagnosticKind, Error, Label, ResolverConfig, Span,
    analyze,
};

fn run(ws: &tempfile::TempDir) -> Analysis {
    let config = ResolverConfig::discover(ws.path()).unwrap();
    analyze(ws.path(), &config, &parse_source).unwrap()
}

fn labels(analysis: &Analysis, path: &str) -> Vec<String> {
    analysis
        .dependencies_of(path)
        .expect("file was analyzed")
        .iter()
        .map(|dep| dep.label.to_string())
        .collect()
}

#[test]
fn declared_package_resolves_and_undeclared_is_reported() {
    let ws = workspace(&[
        ("pnpm-lock.yaml", v6_lockfile(&[("left-pad", "1.3.0")]).as_str()),
        (
            "pkg/a.ts",
            "import leftPad from 'left-pad';\nimport { x } from 'not-declared';\n",
        ),
    ]);
    let analysis = run(&ws);

    assert_eq!(
        analysis.dependencies_of("pkg/a.ts").unwrap(),
        [Dependency {
            label: Label::new("", "node_modules/left-pad"),
            kind: DependencyKind::Value,
        }]
    );

    let edges = analysis.edges();
    assert_eq!(edges[&Label::new("pkg", "pkg")].len(), 1);

    assert_eq!(analysis.diagnostics.len(), 1);
    let diagnostic = &analysis.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::ExternalUnmanaged);
    assert_eq!(diagnostic.file, "pkg/a.ts");
    assert_eq!(diagnostic.specifier.as_deref(), Some("not-declared"));
    assert_eq!(diagnostic.span, Some(Span::new(51, 63)));
}

#[test]
fn forward_references_across_directories_resolve() {
    let ws = workspace(&[
        ("a/main.ts", "export { util } from '../z/util';\nconst m = require('../z/data.json');\n"),
        ("z/util.ts", "export const util = 1;\n"),
        ("z/data.json", "{}"),
    ]);
    let analysis = run(&ws);

    assert_eq!(labels(&analysis, "a/main.ts"), ["//z:z"]);
    assert!(analysis.diagnostics.is_empty());
    assert!(analysis.dependencies_of("z/data.json").is_none());
}

#[test]
fn unresolved_local_import_does_not_stop_the_run() {
    let ws = workspace(&[
        ("a.ts", "import './gone';\nimport './b';\n"),
        ("lib/b.ts", ""),
        ("b.ts", ""),
    ]);
    let analysis = run(&ws);

    assert_eq!(analysis.files.len(), 3);
    let unresolved: Vec<_> = analysis
        .diagnostics_of(DiagnosticKind::UnresolvedLocal)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].specifier.as_deref(), Some("./gone"));
}

#[test]
fn ignored_paths_are_not_analyzed() {
    let ws = workspace(&[
        (".gitignore", "# build output\ndist\n**/*.starstar-ig.ts\n"),
        ("dist/out.ts", "import 'missing-everywhere';\n"),
        ("src/x.starstar-ig.ts", "import 'missing-everywhere';\n"),
        ("src/.startstar-ig.ts", ""),
        ("src/main.ts", "import './x.starstar-ig';\n"),
    ]);
    let analysis = run(&ws);

    let files: Vec<&str> = analysis.files.keys().map(String::as_str).collect();
    assert_eq!(files, ["src/.startstar-ig.ts", "src/main.ts"]);
    assert_eq!(
        analysis
            .diagnostics_of(DiagnosticKind::UnresolvedLocal)
            .count(),
        1
    );
}

#[test]
fn type_packages_builtins_and_ambient_modules() {
    let ws = workspace(&[
        (
            "pnpm-lock.yaml",
            v6_lockfile(&[
                ("@types/node", "20.1.0"),
                ("@scope/pkg", "2.0.0"),
                ("@types/scope__pkg", "2.0.0"),
                ("@types/jquery", "3.5.0"),
            ])
            .as_str(),
        ),
        ("types/env.d.ts", "declare module 'virtual:env' {\n}\n"),
        (
            "src/app.ts",
            "import { readFile } from 'node:fs';\nimport path from 'path';\nimport { thing } from '@scope/pkg/sub';\nimport $ from 'jquery';\nimport env from 'virtual:env';\n",
        ),
    ]);
    let analysis = run(&ws);

    let deps = analysis.dependencies_of("src/app.ts").unwrap();
    let rendered: Vec<(String, DependencyKind)> = deps
        .iter()
        .map(|d| (d.label.to_string(), d.kind))
        .collect();
    assert_eq!(
        rendered,
        [
            ("//:node_modules/@scope/pkg".to_string(), DependencyKind::Value),
            ("//:node_modules/@types/jquery".to_string(), DependencyKind::TypeOnly),
            ("//:node_modules/@types/node".to_string(), DependencyKind::TypeOnly),
            ("//:node_modules/@types/scope__pkg".to_string(), DependencyKind::TypeOnly),
            ("//types:types".to_string(), DependencyKind::TypeOnly),
        ]
    );
    assert!(analysis.diagnostics.is_empty());
}

#[test]
fn type_only_imports_and_nested_projects() {
    let ws = workspace(&[
        ("pnpm-lock.yaml", v6_lockfile(&[("react", "18.2.0")]).as_str()),
        ("apps/web/pnpm-lock.yaml", v6_lockfile(&[("vite", "5.0.0")]).as_str()),
        (
            "apps/web/src/main.ts",
            "import type { FC } from 'react';\nimport { defineConfig } from 'vite';\n",
        ),
    ]);
    let analysis = run(&ws);

    let deps = analysis.dependencies_of("apps/web/src/main.ts").unwrap();
    assert_eq!(
        deps,
        [
            Dependency {
                label: Label::new("", "node_modules/react"),
                kind: DependencyKind::TypeOnly,
            },
            Dependency {
                label: Label::new("apps/web", "node_modules/vite"),
                kind: DependencyKind::Value,
            },
        ]
    );
}

#[test]
fn tsconfig_paths_and_root_dirs() {
    let ws = workspace(&[
        (
            "tsconfig.base.json",
            r#"{
                // shared
                "compilerOptions": {
                    "baseUrl": ".",
                    "paths": { "@lib/*": ["libs/*/src"] }
                }
            }"#,
        ),
        (
            "app/tsconfig.json",
            r#"{
                "extends": "../tsconfig.base.json",
                "compilerOptions": { "rootDirs": ["src", "generated"] },
                "references": [{ "path": "../libs/ui" }]
            }"#,
        ),
        ("libs/ui/tsconfig.json", "{}"),
        ("libs/ui/src/index.ts", ""),
        ("app/generated/schema.ts", ""),
        (
            "app/src/main.ts",
            "import { Button } from '@lib/ui';\nimport { schema } from './schema';\n",
        ),
    ]);
    let analysis = run(&ws);

    assert_eq!(
        labels(&analysis, "app/src/main.ts"),
        ["//app/generated:generated", "//libs/ui/src:src"]
    );
    assert!(analysis.diagnostics.is_empty());

    let graph = &analysis.project_references;
    let edge = graph.edge_indices().next().unwrap();
    let (from, to) = graph.edge_endpoints(edge).unwrap();
    assert_eq!((graph[from].as_str(), graph[to].as_str()), ("app", "libs/ui"));
}

#[test]
fn configuration_drives_naming_and_overrides() {
    let ws = workspace(&[
        (
            "tsdeps.toml",
            r#"
            libraryNaming = "{dirname}_lib"
            testsNaming = "{dirname}_test"
            testFilePatterns = ["*_test.ts"]
            ignoreImports = ["virtual:*"]

            [resolve]
            "@protos/*" = "//protos:ts"
            "#,
        ),
        ("svc/handler.ts", "import 'virtual:icons';\nimport { Msg } from '@protos/msg';\n"),
        ("svc/handler_test.ts", "import { handle } from './handler';\n"),
    ]);
    let analysis = run(&ws);

    assert_eq!(analysis.files["svc/handler.ts"].label.to_string(), "//svc:svc_lib");
    assert_eq!(labels(&analysis, "svc/handler.ts"), ["//protos:ts"]);
    assert_eq!(labels(&analysis, "svc/handler_test.ts"), ["//svc:svc_lib"]);
    assert!(analysis.diagnostics.is_empty());
}

#[test]
fn broken_inputs_are_reported_not_fatal() {
    let ws = workspace(&[
        ("pnpm-lock.yaml", "packages: {}\n"),
        ("pkg/package.json", "{ not json"),
        ("pkg/index.ts", "import 'left-pad';\n"),
    ]);
    let analysis = run(&ws);

    let invalid: Vec<&str> = analysis
        .diagnostics_of(DiagnosticKind::InvalidInput)
        .map(|d| d.file.as_str())
        .collect();
    assert_eq!(invalid, ["pnpm-lock.yaml", "pkg/package.json"]);
    assert_eq!(
        analysis
            .diagnostics_of(DiagnosticKind::ExternalUnmanaged)
            .count(),
        1
    );
}

#[test]
fn missing_root_and_bad_configuration_abort() {
    let missing = std::path::Path::new("/nonexistent/tsdeps/workspace");
    let result = analyze(missing, &ResolverConfig::default(), &parse_source);
    assert!(matches!(result, Err(Error::WorkspaceNotFound { .. })));

    let ws = workspace(&[("tsdeps.toml", "ignoreImports = [\"[\"]\n")]);
    assert!(matches!(
        ResolverConfig::discover(ws.path()),
        Err(Error::InvalidGlob { .. })
    ));
}
