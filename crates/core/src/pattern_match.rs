//! Pattern matching utilities for `LIKE`, search terms and schema `pattern` rules.
//!
//! # LIKE
//!
//! `LIKE` is substring containment: every `%` in the pattern is dropped and the
//! remainder must occur somewhere in the value. `_` has no special meaning.
//!
//! # Regex
//!
//! A compact backtracking engine for the syntax schema rules use:
//! - `.`  any character
//! - `*` `+` `?` `{n}` `{n,}` `{n,m}` greedy quantifiers
//! - `^` / `$` anchors (match is unanchored otherwise)
//! - `(a|b)` groups with alternation, `(?:..)` accepted as a plain group
//! - `\d` `\D` `\w` `\W` `\s` `\S` character classes, also inside brackets
//! - `[abc]` `[a-z]` `[^abc]` bracket classes
//! - `\.` `\\` `\n` `\t` etc. escapes
//!
//! Anything else that would change the meaning of a pattern (lazy quantifiers,
//! backreferences, unbalanced groups, dangling quantifiers) is rejected by
//! [`Pattern::compile`] rather than read as literal text.
//!
//! Patterns are compiled once into a `Pattern` and can be matched repeatedly.

/// `LIKE` matching: `%` is stripped and the rest must be a substring of `value`.
///
/// ```
/// use tabula_core::pattern_match::like;
/// assert!(like("hello", "%ell%"));
/// assert!(like("hello", "ell"));
/// assert!(!like("hello", "h%o"));
/// ```
pub fn like(value: &str, pattern: &str) -> bool {
    let needle: String = pattern.chars().filter(|&c| c != '%').collect();
    value.contains(needle.as_str())
}

/// Case-insensitive substring test used by search terms.
pub fn contains_ignore_case(value: &str, term: &str) -> bool {
    value.to_lowercase().contains(&term.to_lowercase())
}

/// Compiles and matches in one step. An invalid pattern never matches.
///
/// ```
/// use tabula_core::pattern_match::regex;
/// assert!(regex("abc123", "\\d+"));
/// assert!(!regex("abc123", "^\\d+$"));
/// assert!(regex("abc123", "^[a-z]+\\d{3}$"));
/// ```
pub fn regex(value: &str, pattern: &str) -> bool {
    Pattern::compile(pattern).is_some_and(|p| p.is_match(value))
}

#[derive(Clone, Debug)]
enum ClassItem {
    Char(char),
    Range(char, char),
    Shorthand(Atom),
}

#[derive(Clone, Debug)]
enum Atom {
    Any,
    Char(char),
    Digit { negate: bool },
    Word { negate: bool },
    Space { negate: bool },
    Class { negate: bool, items: Vec<ClassItem> },
}

impl Atom {
    fn matches(&self, c: char) -> bool {
        match self {
            Atom::Any => true,
            Atom::Char(ch) => *ch == c,
            Atom::Digit { negate } => c.is_ascii_digit() != *negate,
            Atom::Word { negate } => (c.is_alphanumeric() || c == '_') != *negate,
            Atom::Space { negate } => c.is_whitespace() != *negate,
            Atom::Class { negate, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Char(ch) => *ch == c,
                    ClassItem::Range(lo, hi) => *lo <= c && c <= *hi,
                    ClassItem::Shorthand(atom) => atom.matches(c),
                });
                hit != *negate
            }
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    Atom(Atom),
    Start,
    End,
    Group(Vec<Branch>),
}

/// A node with its repetition bounds; `max` is `None` when unbounded.
#[derive(Clone, Debug)]
struct Piece {
    node: Node,
    min: usize,
    max: Option<usize>,
}

type Branch = Vec<Piece>;

/// A compiled regex pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    branches: Vec<Branch>,
}

impl Pattern {
    /// Compiles a pattern. Returns None for syntax the engine cannot honour.
    pub fn compile(source: &str) -> Option<Self> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
        };
        let branches = parser.alternation()?;
        if parser.pos != parser.chars.len() {
            // stray `)`
            return None;
        }
        Some(Self { branches })
    }

    /// Returns true if the pattern matches somewhere in `value`.
    pub fn is_match(&self, value: &str) -> bool {
        let chars: Vec<char> = value.chars().collect();
        (0..=chars.len())
            .any(|start| match_alternation(&self.branches, &chars, start, &|_: usize| true))
    }
}

type Continuation<'a> = &'a dyn Fn(usize) -> bool;

fn match_alternation(branches: &[Branch], chars: &[char], pos: usize, k: Continuation<'_>) -> bool {
    branches
        .iter()
        .any(|branch| match_branch(branch, chars, pos, k))
}

fn match_branch(pieces: &[Piece], chars: &[char], pos: usize, k: Continuation<'_>) -> bool {
    match pieces.split_first() {
        None => k(pos),
        Some((piece, rest)) => match_piece(piece, 0, chars, pos, &|next: usize| {
            match_branch(rest, chars, next, k)
        }),
    }
}

/// Greedy repetition: one more occurrence first, then hand over to `k`.
fn match_piece(piece: &Piece, count: usize, chars: &[char], pos: usize, k: Continuation<'_>) -> bool {
    let room = piece.max.map_or(true, |max| count < max);
    if room
        && match_node(&piece.node, chars, pos, &|next: usize| {
            if next == pos {
                // an empty occurrence can repeat to any count
                k(next)
            } else {
                match_piece(piece, count + 1, chars, next, k)
            }
        })
    {
        return true;
    }
    count >= piece.min && k(pos)
}

fn match_node(node: &Node, chars: &[char], pos: usize, k: Continuation<'_>) -> bool {
    match node {
        Node::Atom(atom) => pos < chars.len() && atom.matches(chars[pos]) && k(pos + 1),
        Node::Start => pos == 0 && k(pos),
        Node::End => pos == chars.len() && k(pos),
        Node::Group(branches) => match_alternation(branches, chars, pos, k),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn alternation(&mut self) -> Option<Vec<Branch>> {
        let mut branches = vec![self.branch()?];
        while self.eat('|') {
            branches.push(self.branch()?);
        }
        Some(branches)
    }

    fn branch(&mut self) -> Option<Branch> {
        let mut pieces = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let node = self.node()?;
            let (min, max) = self.quantifier()?;
            pieces.push(Piece { node, min, max });
        }
        Some(pieces)
    }

    fn node(&mut self) -> Option<Node> {
        let c = self.peek()?;
        self.pos += 1;
        let node = match c {
            '^' => Node::Start,
            '$' => Node::End,
            '.' => Node::Atom(Atom::Any),
            '(' => {
                if self.eat('?') && !self.eat(':') {
                    return None;
                }
                let branches = self.alternation()?;
                if !self.eat(')') {
                    return None;
                }
                Node::Group(branches)
            }
            '[' => Node::Atom(self.class()?),
            '\\' => Node::Atom(self.escape()?),
            '*' | '+' | '?' | '{' => return None,
            ch => Node::Atom(Atom::Char(ch)),
        };
        Some(node)
    }

    /// Reads an optional quantifier; `Some((1, Some(1)))` when there is none.
    fn quantifier(&mut self) -> Option<(usize, Option<usize>)> {
        let bounds = match self.peek() {
            Some('*') => (0, None),
            Some('+') => (1, None),
            Some('?') => (0, Some(1)),
            Some('{') => {
                self.pos += 1;
                return self.braces();
            }
            _ => return Some((1, Some(1))),
        };
        self.pos += 1;
        Some(bounds)
    }

    /// Parses `n}`, `n,}` or `n,m}` after an opening brace.
    fn braces(&mut self) -> Option<(usize, Option<usize>)> {
        let min = self.number()?;
        let max = if self.eat(',') {
            if self.peek() == Some('}') {
                None
            } else {
                Some(self.number()?)
            }
        } else {
            Some(min)
        };
        if !self.eat('}') || max.is_some_and(|max| max < min) {
            return None;
        }
        Some((min, max))
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.chars[start..self.pos].iter().collect::<String>().parse().ok()
    }

    /// A `-` that is followed by something other than the closing `]`.
    fn at_range_dash(&self) -> bool {
        self.peek() == Some('-') && self.chars.get(self.pos + 1).is_some_and(|&c| c != ']')
    }

    /// Parses the character after a backslash.
    fn escape(&mut self) -> Option<Atom> {
        let c = self.peek()?;
        self.pos += 1;
        let atom = match c {
            'd' => Atom::Digit { negate: false },
            'D' => Atom::Digit { negate: true },
            'w' => Atom::Word { negate: false },
            'W' => Atom::Word { negate: true },
            's' => Atom::Space { negate: false },
            'S' => Atom::Space { negate: true },
            'n' => Atom::Char('\n'),
            't' => Atom::Char('\t'),
            'r' => Atom::Char('\r'),
            c if c.is_ascii_alphanumeric() => return None,
            other => Atom::Char(other),
        };
        Some(atom)
    }

    /// Parses a bracket class after `[`: `[abc]`, `[a-z]`, `[^abc]`, `[\d.]`.
    fn class(&mut self) -> Option<Atom> {
        let negate = self.eat('^');
        let mut items = Vec::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            let item = match c {
                ']' if !items.is_empty() => break,
                '\\' => match self.escape()? {
                    Atom::Char(ch) => ClassItem::Char(ch),
                    shorthand => ClassItem::Shorthand(shorthand),
                },
                ch => ClassItem::Char(ch),
            };
            match item {
                ClassItem::Char(lo) if self.at_range_dash() => {
                    self.pos += 1;
                    let hi = match self.peek()? {
                        '\\' => {
                            self.pos += 1;
                            match self.escape()? {
                                Atom::Char(ch) => ch,
                                _ => return None,
                            }
                        }
                        ch => {
                            self.pos += 1;
                            ch
                        }
                    };
                    if hi < lo {
                        return None;
                    }
                    items.push(ClassItem::Range(lo, hi));
                }
                item => items.push(item),
            }
        }
        Some(Atom::Class { negate, items })
    }
}
