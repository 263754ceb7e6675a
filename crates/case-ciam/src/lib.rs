// CIAM source-to-source preprocessor. Safe to call unconditionally.
//
// If the source contains `call CIAM[on]`, it will:
// - repair ambiguous constructs (a `Print` with no argument),
// - abstract repeated Print literals into generated Fn macros,
// - auto-alias near-miss function calls.
//
// If CIAM is not enabled inline, `preprocess` returns the input unchanged.

use rustc_hash::{FxHashMap, FxHashSet};

/// Placeholder literal used when a `Print` has no argument and no string
/// literal exists anywhere in the source to infer one from.
const INFERRED_PLACEHOLDER: &str = "[CIAM] Inferred print content (no argument provided)";

/// Token kinds for the lossless CIAM tokenizer.
///
/// Whitespace, comments, and unknown characters all land in `Ws` so that
/// re-serializing the token stream reproduces the original formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Str,
    Symbol,
    Ws,
}

#[derive(Debug, Clone)]
struct Tok {
    kind: Kind,
    /// For `Str` this stores the unescaped content, without quotes.
    text: String,
}

impl Tok {
    fn new(kind: Kind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn is_word(&self, w: &str) -> bool {
        self.kind == Kind::Word && self.text == w
    }

    fn is_symbol(&self, c: char) -> bool {
        self.kind == Kind::Symbol && self.text.len() == 1 && self.text.starts_with(c)
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_symbol_char(c: char) -> bool {
    matches!(
        c,
        '(' | ')'
            | '{'
            | '}'
            | '['
            | ']'
            | '='
            | ';'
            | ','
            | '+'
            | '-'
            | '*'
            | '/'
            | '<'
            | '>'
            | '!'
            | '&'
            | '|'
            | '%'
            | ':'
            | '.'
    )
}

/// Lossless tokenizer: every input byte lands in exactly one token, except
/// string escapes which are decoded here and re-encoded by [`to_text`].
fn lex(src: &str) -> Vec<Tok> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let n = chars.len();

    while i < n {
        let c = chars[i];

        // Whitespace runs.
        if c.is_whitespace() {
            let s = i;
            i += 1;
            while i < n && chars[i].is_whitespace() {
                i += 1;
            }
            out.push(Tok::new(Kind::Ws, chars[s..i].iter().collect::<String>()));
            continue;
        }

        // Line comments are preserved as whitespace.
        if c == '/' && i + 1 < n && chars[i + 1] == '/' {
            let s = i;
            i += 2;
            while i < n && chars[i] != '\n' {
                i += 1;
            }
            out.push(Tok::new(Kind::Ws, chars[s..i].iter().collect::<String>()));
            continue;
        }

        // String literal. Accepted even if unterminated (best-effort).
        if c == '"' {
            i += 1;
            let mut acc = String::new();
            while i < n {
                let ch = chars[i];
                i += 1;
                if ch == '"' {
                    break;
                }
                if ch == '\\' && i < n {
                    let esc = chars[i];
                    i += 1;
                    match esc {
                        'n' => acc.push('\n'),
                        't' => acc.push('\t'),
                        'r' => acc.push('\r'),
                        '\\' => acc.push('\\'),
                        '"' => acc.push('"'),
                        other => acc.push(other),
                    }
                } else {
                    acc.push(ch);
                }
            }
            out.push(Tok::new(Kind::Str, acc));
            continue;
        }

        if is_word_start(c) {
            let s = i;
            i += 1;
            while i < n && is_word_char(chars[i]) {
                i += 1;
            }
            out.push(Tok::new(Kind::Word, chars[s..i].iter().collect::<String>()));
            continue;
        }

        if is_symbol_char(c) {
            out.push(Tok::new(Kind::Symbol, c.to_string()));
            i += 1;
            continue;
        }

        // Unknown character: keep it as whitespace to remain lossless.
        out.push(Tok::new(Kind::Ws, c.to_string()));
        i += 1;
    }

    out
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn to_text(toks: &[Tok]) -> String {
    let mut s = String::with_capacity(toks.len() * 4);
    for t in toks {
        if t.kind == Kind::Str {
            s.push('"');
            s.push_str(&escape_string(&t.text));
            s.push('"');
        } else {
            s.push_str(&t.text);
        }
    }
    s
}

/// First non-whitespace token index at or after `i`.
fn next_non_ws(toks: &[Tok], i: usize) -> usize {
    let mut j = i;
    while j < toks.len() && toks[j].kind == Kind::Ws {
        j += 1;
    }
    j
}

/// Levenshtein edit distance, two-row formulation.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Transform CASE source according to the CIAM rules.
///
/// Keeps the original formatting as far as reasonably possible and removes
/// the `call CIAM[on]`/`call CIAM[off]` directives from the output. When the
/// final directive state is not enabled, the input is returned verbatim.
pub fn preprocess(src: &str) -> String {
    let mut toks = lex(src);

    // Detect CIAM directives: call CIAM[on|off]. The last directive wins.
    let mut enabled = false;
    let mut directive_ranges: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < toks.len() {
        let a = next_non_ws(&toks, i);
        let found = (|| {
            if a >= toks.len() || !toks[a].is_word("call") {
                return None;
            }
            let b = next_non_ws(&toks, a + 1);
            if b >= toks.len() || !toks[b].is_word("CIAM") {
                return None;
            }
            let lbr = next_non_ws(&toks, b + 1);
            if lbr >= toks.len() || !toks[lbr].is_symbol('[') {
                return None;
            }
            let arg = next_non_ws(&toks, lbr + 1);
            if arg >= toks.len() || toks[arg].kind != Kind::Word {
                return None;
            }
            let rbr = next_non_ws(&toks, arg + 1);
            if rbr >= toks.len() || !toks[rbr].is_symbol(']') {
                return None;
            }
            Some((a, arg, rbr))
        })();

        match found {
            Some((a, arg, rbr)) => {
                match toks[arg].text.as_str() {
                    "on" => enabled = true,
                    "off" => enabled = false,
                    _ => {}
                }
                // Extend the removal range left over same-line whitespace.
                let mut start = a;
                while start > 0
                    && toks[start - 1].kind == Kind::Ws
                    && !toks[start - 1].text.contains('\n')
                {
                    start -= 1;
                }
                directive_ranges.push((start, rbr + 1));
                i = rbr + 1;
            }
            None => i += 1,
        }
    }

    if !enabled {
        return src.to_string();
    }

    // Remove directives from the token stream, back to front.
    directive_ranges.sort_by(|x, y| y.0.cmp(&x.0));
    for (start, end) in directive_ranges {
        toks.drain(start..end.min(toks.len()));
    }

    // Learn function names declared as: Fn <name>
    let mut fn_names: FxHashSet<String> = FxHashSet::default();
    let mut fn_order: Vec<String> = Vec::new();
    let mut i = 0;
    while i < toks.len() {
        if toks[i].is_word("Fn") {
            let name_idx = next_non_ws(&toks, i + 1);
            if name_idx < toks.len() && toks[name_idx].kind == Kind::Word {
                if fn_names.insert(toks[name_idx].text.clone()) {
                    fn_order.push(toks[name_idx].text.clone());
                }
                i = name_idx;
            }
        }
        i += 1;
    }

    // Scan Print occurrences; track the last string literal in the stream,
    // which seeds repair of argument-less Prints.
    let mut print_freq: FxHashMap<String, u32> = FxHashMap::default();
    let mut literal_order: Vec<String> = Vec::new();
    let mut bare_prints: Vec<usize> = Vec::new();
    let mut last_string = String::new();

    for i in 0..toks.len() {
        if toks[i].kind == Kind::Str {
            last_string = toks[i].text.clone();
        }
        if toks[i].is_word("Print") {
            let s = next_non_ws(&toks, i + 1);
            if s < toks.len() && toks[s].kind == Kind::Str {
                let lit = toks[s].text.clone();
                if !print_freq.contains_key(&lit) {
                    literal_order.push(lit.clone());
                }
                *print_freq.entry(lit).or_insert(0) += 1;
            } else {
                bare_prints.push(i);
            }
        }
    }

    // Repair argument-less Prints, back to front so recorded indices stay
    // valid across insertions.
    let inferred = if last_string.is_empty() {
        INFERRED_PLACEHOLDER.to_string()
    } else {
        last_string
    };
    for &idx in bare_prints.iter().rev() {
        let mut insert_at = next_non_ws(&toks, idx + 1);
        if insert_at < toks.len() && toks[insert_at].kind != Kind::Ws {
            toks.insert(insert_at, Tok::new(Kind::Ws, " "));
            insert_at += 1;
        }
        toks.insert(insert_at, Tok::new(Kind::Str, inferred.clone()));
    }
    if !bare_prints.is_empty() {
        if !print_freq.contains_key(&inferred) {
            literal_order.push(inferred.clone());
        }
        *print_freq.entry(inferred).or_insert(0) += bare_prints.len() as u32;
    }

    // Build macros for repeated Print literals, numbered in first-seen order.
    let mut lit2macro: FxHashMap<String, String> = FxHashMap::default();
    let mut macros: Vec<(String, String)> = Vec::new();
    let mut counter = 1;
    for lit in &literal_order {
        if print_freq.get(lit).copied().unwrap_or(0) >= 2 {
            let name = format!("_CIAM_Print_{counter}");
            counter += 1;
            lit2macro.insert(lit.clone(), name.clone());
            macros.push((name, lit.clone()));
        }
    }

    if !macros.is_empty() {
        // Replace each `Print "<lit>"` with `call <macro> []`, preserving the
        // whitespace between Print and its argument.
        let mut i = 0;
        while i < toks.len() {
            if !toks[i].is_word("Print") {
                i += 1;
                continue;
            }
            let s = next_non_ws(&toks, i + 1);
            if s >= toks.len() || toks[s].kind != Kind::Str {
                i += 1;
                continue;
            }
            let Some(macro_name) = lit2macro.get(&toks[s].text).cloned() else {
                i += 1;
                continue;
            };

            let between: Vec<Tok> = toks[i + 1..s].to_vec();
            toks.drain(i..=s);

            let mut ins = i;
            let mut insert = |toks: &mut Vec<Tok>, t: Tok| {
                toks.insert(ins, t);
                ins += 1;
            };
            insert(&mut toks, Tok::new(Kind::Word, "call"));
            for b in between {
                insert(&mut toks, b);
            }
            insert(&mut toks, Tok::new(Kind::Word, macro_name));
            insert(&mut toks, Tok::new(Kind::Ws, " "));
            insert(&mut toks, Tok::new(Kind::Symbol, "["));
            insert(&mut toks, Tok::new(Kind::Symbol, "]"));
            i = ins;
        }

        // Prepend Fn definitions for the macros after any leading whitespace.
        let mut defs: Vec<Tok> = Vec::new();
        for (name, literal) in &macros {
            defs.push(Tok::new(Kind::Word, "Fn"));
            defs.push(Tok::new(Kind::Ws, " "));
            defs.push(Tok::new(Kind::Word, name.clone()));
            defs.push(Tok::new(Kind::Ws, " "));
            defs.push(Tok::new(Kind::Symbol, "{"));
            defs.push(Tok::new(Kind::Ws, "\n  "));
            defs.push(Tok::new(Kind::Word, "Print"));
            defs.push(Tok::new(Kind::Ws, " "));
            defs.push(Tok::new(Kind::Str, literal.clone()));
            defs.push(Tok::new(Kind::Ws, "\n"));
            defs.push(Tok::new(Kind::Symbol, "}"));
            defs.push(Tok::new(Kind::Ws, "\n\n"));
        }
        let head = next_non_ws(&toks, 0);
        toks.splice(head..head, defs);
    }

    // Correct near-miss call targets against the learned Fn names. The
    // synthesized macro names count as declared so their calls are left
    // alone. Calls are re-scanned because earlier rewrites moved tokens.
    if !fn_names.is_empty() {
        let mut declared = fn_names.clone();
        let mut declared_order = fn_order;
        for (name, _) in &macros {
            declared.insert(name.clone());
            declared_order.push(name.clone());
        }

        let mut i = 0;
        while i < toks.len() {
            if toks[i].is_word("call") {
                let nidx = next_non_ws(&toks, i + 1);
                if nidx < toks.len() && toks[nidx].kind == Kind::Word {
                    let name = toks[nidx].text.clone();
                    if name != "CIAM" && !declared.contains(&name) {
                        let mut best_dist = usize::MAX;
                        let mut best_name = String::new();
                        for fn_name in &declared_order {
                            let d = edit_distance(&name, fn_name);
                            if d < best_dist {
                                best_dist = d;
                                best_name = fn_name.clone();
                                if best_dist == 0 {
                                    break;
                                }
                            }
                        }
                        if best_dist <= 2 && !best_name.is_empty() {
                            toks[nidx].text = best_name;
                        }
                    }
                    i = nidx;
                }
            }
            i += 1;
        }
    }

    to_text(&toks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_directive() {
        let src = "Fn main {\n  Print \"hello\"\n}\n";
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn identity_when_final_state_is_off() {
        let src = "call CIAM[on]\nPrint \"a\"\ncall CIAM[off]\n";
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn directives_are_removed_when_enabled() {
        let out = preprocess("call CIAM[on]\nPrint \"solo\"\n");
        assert!(!out.contains("CIAM[on]"));
        assert!(out.contains("Print \"solo\""));
    }

    #[test]
    fn bare_print_gains_last_literal() {
        // The repair literal is the last string seen anywhere in the stream.
        let out = preprocess("call CIAM[on]\nPrint\nPrint \"hi\"\n");
        assert!(!out.contains("CIAM"));
        // Both prints now reference "hi", which makes it repeated, which in
        // turn extracts a macro for it.
        assert!(out.contains("Fn _CIAM_Print_1"));
        assert!(out.contains("call _CIAM_Print_1 []"));
    }

    #[test]
    fn bare_print_without_any_literal_gets_placeholder() {
        let out = preprocess("call CIAM[on]\nPrint\n");
        assert!(out.contains(INFERRED_PLACEHOLDER));
    }

    #[test]
    fn repeated_literals_become_macros() {
        let src = "call CIAM[on]\nPrint \"dup\"\nPrint \"dup\"\nPrint \"once\"\n";
        let out = preprocess(src);
        assert!(out.contains("Fn _CIAM_Print_1 {\n  Print \"dup\"\n}"));
        assert_eq!(out.matches("call _CIAM_Print_1 []").count(), 2);
        // The singleton literal stays a plain Print.
        assert!(out.contains("Print \"once\""));
    }

    #[test]
    fn near_miss_call_is_aliased() {
        let src = "call CIAM[on]\nFn greet {\n  Print \"x\"\n}\ncall gret\n";
        let out = preprocess(src);
        assert!(out.contains("call greet"));
        assert!(!out.contains("call gret\n"));
    }

    #[test]
    fn distant_call_is_left_alone() {
        let src = "call CIAM[on]\nFn greet {\n  Print \"x\"\n}\ncall zzzzzzz\n";
        let out = preprocess(src);
        assert!(out.contains("call zzzzzzz"));
    }

    #[test]
    fn unterminated_string_is_accepted() {
        let out = preprocess("call CIAM[on]\nPrint \"open ended");
        assert!(out.contains("open ended"));
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("gret", "greet"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn string_escapes_round_trip() {
        let src = "Print \"a\\n\\t\\\"b\\\\\"";
        assert_eq!(preprocess(src), src);
        let enabled = format!("call CIAM[on]\n{src}\n");
        let out = preprocess(&enabled);
        assert!(out.contains("\"a\\n\\t\\\"b\\\\\""));
    }
}
