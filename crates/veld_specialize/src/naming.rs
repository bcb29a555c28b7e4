//! Specialization naming: short parameter codes, value tokens, and
//! long-name collapsing.
//!
//! Names must be stable within a run (identical resolved arguments always
//! produce the same name), collision-safe design-wide, and short enough to
//! stay debuggable. The cache key, not the name, is authoritative for
//! correctness; collapsing therefore goes through a dedup table so two
//! distinct long names can never fold onto one short name.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use veld_common::{value_hash, Interner};
use veld_config::SpecializeConfig;
use veld_ir::{ConstValue, Decl, DeclId, DeclKind, Design, ModuleId, TypeId};

/// Per-run naming state.
pub struct NamingEngine {
    /// (structural hash, discriminating key) → token number.
    value_map: HashMap<(u64, String), u32>,
    next_value: u32,
    /// Long name → collapsed name.
    long_map: HashMap<String, String>,
    long_id: u32,
    /// Per-module letter assignments for parameter short codes.
    letter_codes: HashMap<ModuleId, HashMap<DeclId, (char, u32)>>,
    /// Every module name in the design, plus every name this engine has
    /// handed out. Hierarchical-block digest probing checks against this.
    known_names: HashSet<String>,
    debug_collision: bool,
    threshold: usize,
}

impl NamingEngine {
    /// Creates a naming engine seeded with every module name already in the
    /// design.
    pub fn new(config: &SpecializeConfig, design: &Design, interner: &Interner) -> Self {
        let known_names = design
            .modules
            .values()
            .map(|m| interner.resolve(m.name).to_string())
            .collect();
        Self {
            value_map: HashMap::new(),
            next_value: 1,
            long_map: HashMap::new(),
            long_id: 0,
            letter_codes: HashMap::new(),
            known_names,
            debug_collision: config.debug_collision,
            threshold: config.long_name_threshold,
        }
    }

    /// Returns the short code for a parameter or interface-port declaration.
    ///
    /// The code is the upper-cased first letter of the declaration's own
    /// name (`T` for type parameters, `Z` for names starting outside A–Z),
    /// disambiguated by a per-letter running counter assigned in declaration
    /// order within the module.
    pub fn short_code(
        &mut self,
        design: &Design,
        module: ModuleId,
        decl: DeclId,
        interner: &Interner,
    ) -> String {
        let table = self
            .letter_codes
            .entry(module)
            .or_insert_with(|| assign_letters(&design.modules[module], interner));
        let Some(&(letter, index)) = table.get(&decl) else {
            // A declaration outside the letter set (not a parameter or
            // interface port); fall back to the shared overflow letter.
            return "Z".to_string();
        };
        let mut code = letter.to_string();
        code.push_str(&bijective_base26(index));
        code
    }

    /// Returns the `z<N>` token for a folded value, keyed by a structural
    /// hash plus a discriminating key (the declaration name, or the concrete
    /// interface name). Equal (hash, key) pairs reuse the same token within
    /// one run.
    pub fn value_token(&mut self, encoded: &[u8], key: &str) -> String {
        // debug_collision collapses every hash to a constant so the key
        // comparison alone has to keep distinct values apart.
        let hash = if self.debug_collision {
            0
        } else {
            value_hash(encoded)
        };
        let map_key = (hash, key.to_string());
        let num = match self.value_map.get(&map_key) {
            Some(&n) => n,
            None => {
                let n = self.next_value;
                self.next_value += 1;
                self.value_map.insert(map_key, n);
                n
            }
        };
        format!("z{num}")
    }

    /// Resolves the final specialization name from the concatenated long
    /// name.
    ///
    /// Names within the threshold pass through unchanged; longer names, and
    /// all hierarchical-block names, are collapsed via the stable dedup
    /// table — `<base>__pi<N>` for ordinary modules, a digest prefix for
    /// hierarchical blocks.
    pub fn resolve_name(
        &mut self,
        longname: &str,
        base: &str,
        is_hier_block: bool,
        hier_seed: &[(String, String)],
    ) -> String {
        if longname.len() <= self.threshold && !is_hier_block {
            self.known_names.insert(longname.to_string());
            return longname.to_string();
        }
        if let Some(existing) = self.long_map.get(longname) {
            return existing.clone();
        }
        let newname = if is_hier_block {
            self.hier_block_name(base, hier_seed)
        } else {
            self.long_id += 1;
            // Short codes above are upper case, so the lower-case suffix
            // cannot collide with a pass-through name.
            format!("{base}__pi{}", self.long_id)
        };
        self.long_map.insert(longname.to_string(), newname.clone());
        self.known_names.insert(newname.clone());
        newname
    }

    /// Records a name as taken design-wide.
    pub fn register_name(&mut self, name: &str) {
        self.known_names.insert(name.to_string());
    }

    /// Picks a unique hierarchical-block name: the shortest collision-free
    /// prefix of a SHA-256 digest over (module name, bound parameter names,
    /// literal values), retrying with fresh randomness if the whole digest
    /// collides.
    fn hier_block_name(&mut self, base: &str, seed: &[(String, String)]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(base.as_bytes());
        for (name, value) in seed {
            hasher.update(name.as_bytes());
            hasher.update(value.as_bytes());
        }
        loop {
            let digest = hasher.clone().finalize();
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            for i in 1..hex.len() {
                let mut candidate = base.to_string();
                if !candidate.ends_with('_') {
                    candidate.push('_');
                }
                candidate.push_str(&hex[..i]);
                if !self.known_names.contains(&candidate) {
                    return candidate;
                }
            }
            let salt: [u8; 8] = rand::random();
            hasher.update(salt);
        }
    }
}

/// Canonical byte encoding of a constant for structural hashing.
pub fn encode_const(value: &ConstValue) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        ConstValue::Int(n) => {
            out.push(0);
            out.extend_from_slice(&n.to_le_bytes());
        }
        ConstValue::Real(f) => {
            out.push(1);
            out.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        ConstValue::Logic(lv) => {
            out.push(2);
            out.extend_from_slice(&lv.width().to_le_bytes());
            for i in 0..lv.width() {
                out.push(lv.get(i) as u8);
            }
        }
        ConstValue::String(s) => {
            out.push(3);
            out.extend_from_slice(s.as_bytes());
        }
        ConstValue::Bool(b) => {
            out.push(4);
            out.push(u8::from(*b));
        }
    }
    out
}

/// Canonical byte encoding of an interned type for structural hashing.
pub fn encode_type(ty: TypeId) -> Vec<u8> {
    let mut out = vec![5];
    out.extend_from_slice(&ty.as_raw().to_le_bytes());
    out
}

/// The literal text of a constant, as used in hierarchical-block digests.
pub fn const_ascii(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(n) => n.to_string(),
        ConstValue::Real(f) => format!("{f}"),
        ConstValue::Logic(lv) => format!("{lv}"),
        ConstValue::String(s) => s.clone(),
        ConstValue::Bool(b) => u8::from(*b).to_string(),
    }
}

/// Assigns (letter, per-letter index) pairs to every parameter and
/// interface-port declaration of a module, in declaration order.
fn assign_letters(
    module: &veld_ir::Module,
    interner: &Interner,
) -> HashMap<DeclId, (char, u32)> {
    let mut used = [0u32; 26];
    let mut table = HashMap::new();
    for (id, decl) in module.decls.iter() {
        let letter = match &decl.kind {
            DeclKind::ValueParam { .. } | DeclKind::InterfacePort { .. } => {
                first_letter(decl, interner)
            }
            DeclKind::TypeParam { .. } => 'T',
            _ => continue,
        };
        let slot = (letter as u8 - b'A') as usize;
        table.insert(id, (letter, used[slot]));
        used[slot] += 1;
    }
    table
}

fn first_letter(decl: &Decl, interner: &Interner) -> char {
    let name = interner.resolve(decl.name);
    match name.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some(c) if c.is_ascii_uppercase() => c,
        _ => 'Z',
    }
}

/// Encodes a zero-based index as an upper-case bijective base-26 suffix:
/// 0 → "", 1 → "A", 2 → "B", 26 → "Z", 27 → "AA".
fn bijective_base26(index: u32) -> String {
    let mut n = index;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_ir::Module;
    use veld_source::Span;

    fn engine(debug_collision: bool) -> NamingEngine {
        let config = SpecializeConfig {
            debug_collision,
            ..SpecializeConfig::default()
        };
        let design = Design::new();
        let interner = Interner::new();
        NamingEngine::new(&config, &design, &interner)
    }

    fn module_with_params(interner: &Interner, names: &[&str]) -> (Design, ModuleId, Vec<DeclId>) {
        let mut design = Design::new();
        let mid = design.modules.next_id();
        let mut module = Module::new(mid, interner.get_or_intern("m"), 1, Span::DUMMY);
        let mut ids = Vec::new();
        for name in names {
            let id = module.decls.next_id();
            module.decls.alloc(Decl {
                id,
                name: interner.get_or_intern(name),
                kind: DeclKind::ValueParam {
                    ty: TypeId::from_raw(0),
                    default: None,
                    overridden: false,
                },
                span: Span::DUMMY,
            });
            ids.push(id);
        }
        design.modules.alloc(module);
        design.top = mid;
        (design, mid, ids)
    }

    #[test]
    fn short_codes_first_letter() {
        let interner = Interner::new();
        let (design, mid, ids) = module_with_params(&interner, &["width", "depth"]);
        let mut naming = engine(false);
        assert_eq!(naming.short_code(&design, mid, ids[0], &interner), "W");
        assert_eq!(naming.short_code(&design, mid, ids[1], &interner), "D");
    }

    #[test]
    fn short_codes_disambiguate_same_letter() {
        let interner = Interner::new();
        let (design, mid, ids) = module_with_params(&interner, &["WIDTH", "WAYS", "WRAP"]);
        let mut naming = engine(false);
        assert_eq!(naming.short_code(&design, mid, ids[0], &interner), "W");
        assert_eq!(naming.short_code(&design, mid, ids[1], &interner), "WA");
        assert_eq!(naming.short_code(&design, mid, ids[2], &interner), "WB");
    }

    #[test]
    fn short_code_non_alpha_falls_back() {
        let interner = Interner::new();
        let (design, mid, ids) = module_with_params(&interner, &["_private"]);
        let mut naming = engine(false);
        assert_eq!(naming.short_code(&design, mid, ids[0], &interner), "Z");
    }

    #[test]
    fn type_param_uses_t() {
        let interner = Interner::new();
        let mut design = Design::new();
        let mid = design.modules.next_id();
        let mut module = Module::new(mid, interner.get_or_intern("m"), 1, Span::DUMMY);
        let id = module.decls.next_id();
        module.decls.alloc(Decl {
            id,
            name: interner.get_or_intern("DATA_T"),
            kind: DeclKind::TypeParam {
                default: None,
                overridden: false,
            },
            span: Span::DUMMY,
        });
        design.modules.alloc(module);
        let mut naming = engine(false);
        assert_eq!(naming.short_code(&design, mid, id, &interner), "T");
    }

    #[test]
    fn value_tokens_stable_within_run() {
        let mut naming = engine(false);
        let enc = encode_const(&ConstValue::Int(8));
        let a = naming.value_token(&enc, "WIDTH");
        let b = naming.value_token(&enc, "WIDTH");
        assert_eq!(a, b);
        assert_eq!(a, "z1");
    }

    #[test]
    fn value_tokens_distinguish_values_and_keys() {
        let mut naming = engine(false);
        let a = naming.value_token(&encode_const(&ConstValue::Int(8)), "WIDTH");
        let b = naming.value_token(&encode_const(&ConstValue::Int(16)), "WIDTH");
        let c = naming.value_token(&encode_const(&ConstValue::Int(8)), "DEPTH");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn forced_collisions_still_distinguish_keys() {
        let mut naming = engine(true);
        let a = naming.value_token(&encode_const(&ConstValue::Int(8)), "WIDTH");
        let b = naming.value_token(&encode_const(&ConstValue::Int(16)), "DEPTH");
        let a2 = naming.value_token(&encode_const(&ConstValue::Int(8)), "WIDTH");
        assert_ne!(a, b);
        assert_eq!(a, a2);
    }

    #[test]
    fn short_names_pass_through() {
        let mut naming = engine(false);
        let name = naming.resolve_name("fifo_W8", "fifo", false, &[]);
        assert_eq!(name, "fifo_W8");
    }

    #[test]
    fn long_names_collapse_with_increasing_ids() {
        let mut naming = engine(false);
        let long_a = format!("fifo_{}", "W8_D1024_".repeat(5));
        let long_b = format!("fifo_{}", "W16_D2048_".repeat(5));
        let a = naming.resolve_name(&long_a, "fifo", false, &[]);
        let b = naming.resolve_name(&long_b, "fifo", false, &[]);
        assert_eq!(a, "fifo__pi1");
        assert_eq!(b, "fifo__pi2");
    }

    #[test]
    fn identical_long_names_collapse_identically() {
        let mut naming = engine(false);
        let long = format!("fifo_{}", "W8_D1024_".repeat(5));
        let a = naming.resolve_name(&long, "fifo", false, &[]);
        let b = naming.resolve_name(&long, "fifo", false, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn hier_block_names_always_collapse() {
        let mut naming = engine(false);
        let seed = vec![("WIDTH".to_string(), "8".to_string())];
        let name = naming.resolve_name("mult_W8", "mult", true, &seed);
        assert!(name.starts_with("mult_"));
        assert_ne!(name, "mult_W8");
        // Deterministic for the same seed
        let again = naming.resolve_name("mult_W8", "mult", true, &seed);
        assert_eq!(name, again);
    }

    #[test]
    fn hier_block_prefix_probes_past_taken_names() {
        let mut naming = engine(false);
        let seed = vec![("WIDTH".to_string(), "8".to_string())];
        // Take the shortest prefix, then ask again with it occupied
        let probe = naming.hier_block_name("mult", &seed);
        naming.register_name(&probe);
        let second = naming.hier_block_name("mult", &seed);
        assert_ne!(probe, second);
        assert!(second.starts_with(&probe), "prefix must extend, not restart");
    }

    #[test]
    fn bijective_base26_encoding() {
        assert_eq!(bijective_base26(0), "");
        assert_eq!(bijective_base26(1), "A");
        assert_eq!(bijective_base26(2), "B");
        assert_eq!(bijective_base26(26), "Z");
        assert_eq!(bijective_base26(27), "AA");
    }

    #[test]
    fn encode_const_distinguishes_variants() {
        assert_ne!(
            encode_const(&ConstValue::Int(1)),
            encode_const(&ConstValue::Bool(true))
        );
        assert_ne!(
            encode_const(&ConstValue::Int(1)),
            encode_const(&ConstValue::Int(2))
        );
    }
}
