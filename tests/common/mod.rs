//! Scripted loader shared by the integration tests.
//!
//! A script is a text file with one function per line:
//!
//! ```text
//! <name> <symbol> <param,param|-> -> <result>
//! ```
//!
//! Invocation is resolved by symbol against a fixed set of behaviors.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow, bail};
use parking_lot::Mutex;
use tempfile::TempDir;

use polycall::{DiscoveredFunction, Loader, LoaderFactory, ParamType, Runtime, Signature, Value};

pub const TAG: &str = "script";

/// Counts loader instances that were created and not yet torn down.
#[derive(Clone, Default)]
pub struct LiveLoaders(Arc<AtomicUsize>);

impl LiveLoaders {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ScriptLoader {
    tag: String,
    live: LiveLoaders,
    last_loaded: Mutex<Vec<DiscoveredFunction>>,
}

impl ScriptLoader {
    fn parse(path: &Path) -> Result<Vec<DiscoveredFunction>> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(parse_line)
            .collect()
    }
}

fn parse_line(line: &str) -> Result<DiscoveredFunction> {
    let (decl, result) = line
        .split_once("->")
        .ok_or_else(|| anyhow!("missing `->` in `{line}`"))?;
    let mut parts = decl.split_whitespace();
    let (Some(name), Some(symbol), Some(params)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed script line `{line}`");
    };

    let (params, variadic) = match params.strip_suffix("...") {
        Some(rest) => (rest, true),
        None => (params, false),
    };
    let params = params
        .split(',')
        .filter(|param| !param.is_empty() && *param != "-")
        .map(str::parse::<ParamType>)
        .collect::<Result<Vec<_>, _>>()?;
    let result = result.trim().parse::<ParamType>()?;

    Ok(DiscoveredFunction {
        name: name.to_string(),
        symbol: symbol.to_string(),
        signature: Signature {
            params,
            variadic,
            result,
        },
    })
}

impl Loader for ScriptLoader {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn load_from_file(&self, paths: &[PathBuf]) -> Result<()> {
        let mut functions = Vec::new();
        for path in paths {
            functions.extend(Self::parse(path)?);
        }
        *self.last_loaded.lock() = functions;
        Ok(())
    }

    fn load_from_memory(&self, _name: &str, buffer: &[u8]) -> Result<()> {
        let source = std::str::from_utf8(buffer).context("script is not utf-8")?;
        let functions = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_line)
            .collect::<Result<Vec<_>>>()?;
        *self.last_loaded.lock() = functions;
        Ok(())
    }

    fn discover(&self) -> Result<Vec<DiscoveredFunction>> {
        Ok(self.last_loaded.lock().clone())
    }

    fn invoke(&self, symbol: &str, args: &[Value]) -> Result<Value> {
        match symbol {
            "add" => Ok(Value::I32(
                args.iter()
                    .map(|arg| arg.as_i32().ok_or_else(|| anyhow!("add got {}", arg.tag())))
                    .sum::<Result<i32>>()?,
            )),
            "concat" => Ok(Value::Str(
                args.iter()
                    .map(|arg| arg.as_str().unwrap_or_default())
                    .collect(),
            )),
            "echo" => Ok(args.first().cloned().unwrap_or_default()),
            "nothing" => Ok(Value::Null),
            "first" => Ok(Value::from("first")),
            "second" => Ok(Value::from("second")),
            "stringly" => Ok(Value::from("41")),
            "fail" => bail!("script raised: boom"),
            other => bail!("unknown script symbol `{other}`"),
        }
    }

    fn teardown(&self) {
        self.live.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn script_factory(tag: &str, live: &LiveLoaders) -> LoaderFactory {
    let tag = tag.to_string();
    let live = live.clone();
    Arc::new(move || {
        live.0.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptLoader {
            tag: tag.clone(),
            live: live.clone(),
            last_loaded: Mutex::new(Vec::new()),
        }) as Arc<dyn Loader>)
    })
}

/// An initialized runtime with the `script` loader available.
pub fn runtime_with_scripts() -> (Runtime, LiveLoaders) {
    let live = LiveLoaders::default();
    let runtime = Runtime::new();
    runtime.register_loader_factory(TAG, script_factory(TAG, &live));
    runtime.initialize().expect("runtime initializes");
    (runtime, live)
}

/// Scratch directory holding script files.
pub struct Scripts {
    dir: TempDir,
}

impl Scripts {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write script");
        path
    }

    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
