// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide WebAssembly UDF registry
//!
//! User-defined predicates arrive as base64-encoded WAT modules. The
//! registry compiles and instantiates each module once, binds the
//! exported handler, and serves calls for the lifetime of the process.
//! Modules get no imports, so functions are pure from the host's
//! perspective.
//!
//! Entries are immutable once registered: registering an existing name
//! is a no-op that reports success, and deleting a name while another
//! thread is mid-call cannot tear the invocation (the entry stays alive
//! behind its `Arc` until the call returns). Each entry serializes its
//! own calls; lookups of different functions run concurrently.

use std::sync::{Arc, OnceLock};

use ahash::AHashMap;
use base64::Engine as _;
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use wasmtime::{Engine, Func, Instance, Module, Store, Val};

use crate::core::{Error, Result};

/// Wire names of the supported module payload encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    /// Base64-encoded textual WebAssembly
    Wat,
    /// Base64-encoded binary WebAssembly; reserved, not yet accepted
    Wasm,
}

impl ModuleType {
    /// Returns the wire name used on registration
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Wat => "WAT",
            ModuleType::Wasm => "WASM",
        }
    }
}

/// One compiled and instantiated function
///
/// The store and bound function live behind a mutex because wasmtime
/// stores are single-threaded; calls to the same function serialize.
struct FunctionEntry {
    module_type: ModuleType,
    call: Mutex<CallState>,
}

struct CallState {
    store: Store<()>,
    func: Func,
    results_len: usize,
}

/// Process-wide registry mapping function names to WASM instances
pub struct WasmFunctionRegistry {
    engine: Engine,
    entries: RwLock<AHashMap<String, Arc<FunctionEntry>>>,
}

static REGISTRY: OnceLock<WasmFunctionRegistry> = OnceLock::new();

impl WasmFunctionRegistry {
    fn new() -> Self {
        Self {
            engine: Engine::default(),
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// The process-wide registry instance
    pub fn global() -> &'static WasmFunctionRegistry {
        REGISTRY.get_or_init(WasmFunctionRegistry::new)
    }

    /// Register a function from a base64-encoded module payload
    ///
    /// Binds the export named `handler_name` and stores it under
    /// `func_name`. Returns false when the payload fails to decode,
    /// compile, instantiate, or bind, and for the reserved WASM binary
    /// type. Registering a name that already exists leaves the existing
    /// entry in place and returns true.
    pub fn register(
        &self,
        module_type: ModuleType,
        func_name: &str,
        handler_name: &str,
        payload: &str,
    ) -> bool {
        if self.entries.read().contains_key(func_name) {
            return true;
        }
        if module_type != ModuleType::Wat {
            return false;
        }
        let entry = match self.compile(handler_name, payload) {
            Ok(state) => Arc::new(FunctionEntry {
                module_type,
                call: Mutex::new(state),
            }),
            Err(err) => {
                debug!(func = func_name, %err, "wasm registration failed");
                return false;
            }
        };
        self.entries
            .write()
            .entry(func_name.to_string())
            .or_insert(entry);
        debug!(func = func_name, "wasm function registered");
        true
    }

    fn compile(&self, handler_name: &str, payload: &str) -> Result<CallState> {
        let compile_err = |reason: String| Error::UdfCompile {
            name: handler_name.to_string(),
            reason,
        };
        let wat = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| compile_err(format!("base64 decode: {}", e)))?;
        let module =
            Module::new(&self.engine, &wat).map_err(|e| compile_err(e.to_string()))?;
        let mut store = Store::new(&self.engine, ());
        // no imports: functions are pure from the host's perspective
        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| compile_err(e.to_string()))?;
        let func = instance
            .get_func(&mut store, handler_name)
            .ok_or_else(|| compile_err(format!("no exported function '{}'", handler_name)))?;
        let results_len = func.ty(&store).results().len();
        Ok(CallState {
            store,
            func,
            results_len,
        })
    }

    /// Remove a function from the registry
    ///
    /// Returns true whether or not the name was present.
    pub fn delete(&self, func_name: &str) -> bool {
        let removed = self.entries.write().remove(func_name).is_some();
        if removed {
            debug!(func = func_name, "wasm function deleted");
        }
        true
    }

    /// Returns true if the name is currently registered
    pub fn contains(&self, func_name: &str) -> bool {
        self.entries.read().contains_key(func_name)
    }

    /// The module type a function was registered with
    pub fn module_type(&self, func_name: &str) -> Option<ModuleType> {
        self.entries.read().get(func_name).map(|e| e.module_type)
    }

    fn entry(&self, func_name: &str) -> Result<Arc<FunctionEntry>> {
        self.entries
            .read()
            .get(func_name)
            .cloned()
            .ok_or_else(|| Error::UdfNotFound(func_name.to_string()))
    }

    /// Call a function with i32 arguments, returning every result as i32
    pub fn run(&self, func_name: &str, args: &[i32]) -> Result<Vec<i32>> {
        let entry = self.entry(func_name)?;
        let params: Vec<Val> = args.iter().map(|&v| Val::I32(v)).collect();
        let mut state = entry.call.lock();
        let mut results = vec![Val::I32(0); state.results_len];
        let CallState {
            ref mut store,
            ref func,
            ..
        } = *state;
        func.call(store, &params, &mut results)
            .map_err(|e| Error::UdfCall {
                name: func_name.to_string(),
                reason: e.to_string(),
            })?;
        results
            .iter()
            .map(|val| {
                val.i32().ok_or_else(|| Error::UdfCall {
                    name: func_name.to_string(),
                    reason: "non-i32 result".to_string(),
                })
            })
            .collect()
    }

    /// Call a function with pre-typed arguments, reading the first
    /// result as a boolean (nonzero is true)
    pub fn run_elem_func(&self, func_name: &str, args: &[Val]) -> Result<bool> {
        let entry = self.entry(func_name)?;
        let mut state = entry.call.lock();
        let mut results = vec![Val::I32(0); state.results_len];
        let CallState {
            ref mut store,
            ref func,
            ..
        } = *state;
        func.call(store, args, &mut results)
            .map_err(|e| Error::UdfCall {
                name: func_name.to_string(),
                reason: e.to_string(),
            })?;
        let first = results.first().and_then(|val| val.i32());
        match first {
            Some(v) => Ok(v != 0),
            None => Err(Error::UdfCall {
                name: func_name.to_string(),
                reason: "function returned no i32 result".to_string(),
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    // =========================================================================
    // Registration tests
    // =========================================================================

    #[test]
    fn test_register_and_run_gcd() {
        let registry = WasmFunctionRegistry::global();
        assert!(registry.register(
            ModuleType::Wat,
            "test_gcd",
            "main",
            &encode(GCD_WAT)
        ));
        assert!(registry.contains("test_gcd"));
        assert_eq!(registry.module_type("test_gcd"), Some(ModuleType::Wat));

        assert_eq!(registry.run("test_gcd", &[6, 27]).unwrap(), vec![3]);
        assert_eq!(registry.run("test_gcd", &[15, 10]).unwrap(), vec![5]);

        assert!(registry.delete("test_gcd"));
        assert!(!registry.contains("test_gcd"));
    }

    #[test]
    fn test_register_and_run_equal() {
        let registry = WasmFunctionRegistry::global();
        assert!(registry.register(
            ModuleType::Wat,
            "test_equal",
            "equal",
            &encode(EQUAL_WAT)
        ));
        assert_eq!(registry.run("test_equal", &[6, 27]).unwrap(), vec![0]);
        assert_eq!(registry.run("test_equal", &[27, 27]).unwrap(), vec![1]);
        registry.delete("test_equal");
    }

    #[test]
    fn test_register_duplicate_is_noop() {
        let registry = WasmFunctionRegistry::global();
        assert!(registry.register(
            ModuleType::Wat,
            "test_dup",
            "equal",
            &encode(EQUAL_WAT)
        ));
        // same name with a different body: existing entry stays
        assert!(registry.register(
            ModuleType::Wat,
            "test_dup",
            "main",
            &encode(GCD_WAT)
        ));
        assert_eq!(registry.run("test_dup", &[3, 3]).unwrap(), vec![1]);
        registry.delete("test_dup");
    }

    #[test]
    fn test_register_failures() {
        let registry = WasmFunctionRegistry::global();
        // not base64
        assert!(!registry.register(ModuleType::Wat, "test_bad64", "f", "!!!not-base64!!!"));
        // not a module
        assert!(!registry.register(ModuleType::Wat, "test_badwat", "f", &encode("(modul")));
        // missing export
        assert!(!registry.register(
            ModuleType::Wat,
            "test_noexport",
            "missing",
            &encode(EQUAL_WAT)
        ));
        // binary payloads are reserved
        assert!(!registry.register(
            ModuleType::Wasm,
            "test_binary",
            "f",
            &encode(EQUAL_WAT)
        ));
        for name in ["test_bad64", "test_badwat", "test_noexport", "test_binary"] {
            assert!(!registry.contains(name));
        }
    }

    // =========================================================================
    // Call tests
    // =========================================================================

    #[test]
    fn test_run_unknown_function() {
        let registry = WasmFunctionRegistry::global();
        assert_eq!(
            registry.run("test_unknown", &[1]).unwrap_err(),
            Error::UdfNotFound("test_unknown".to_string())
        );
        assert!(matches!(
            registry.run_elem_func("test_unknown", &[]).unwrap_err(),
            Error::UdfNotFound(_)
        ));
    }

    #[test]
    fn test_run_elem_func_typed() {
        let registry = WasmFunctionRegistry::global();
        assert!(registry.register(
            ModuleType::Wat,
            "test_larger",
            "larger_than",
            &encode(LARGER_THAN_WAT)
        ));
        assert!(registry
            .run_elem_func("test_larger", &[Val::F64(0.7f64.to_bits()), Val::F64(0.5f64.to_bits())])
            .unwrap());
        assert!(!registry
            .run_elem_func("test_larger", &[Val::F64(0.5f64.to_bits()), Val::F64(0.5f64.to_bits())])
            .unwrap());
        registry.delete("test_larger");
    }

    #[test]
    fn test_delete_absent_returns_true() {
        let registry = WasmFunctionRegistry::global();
        assert!(registry.delete("test_never_registered"));
    }
}
