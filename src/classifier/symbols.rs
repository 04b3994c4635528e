//! Catalog of symbols the editor knows how to insert.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SymbolInfo {
    pub symbol: &'static str,
    pub latex: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SymbolCategory {
    pub name: &'static str,
    pub items: &'static [SymbolInfo],
}

const fn sym(symbol: &'static str, latex: &'static str, description: &'static str) -> SymbolInfo {
    SymbolInfo {
        symbol,
        latex,
        description,
    }
}

const BASIC: &[SymbolInfo] = &[
    sym("0", "0", ""),
    sym("1", "1", ""),
    sym("2", "2", ""),
    sym("3", "3", ""),
    sym("4", "4", ""),
    sym("5", "5", ""),
    sym("6", "6", ""),
    sym("7", "7", ""),
    sym("8", "8", ""),
    sym("9", "9", ""),
    sym("a", "a", ""),
    sym("b", "b", ""),
    sym("c", "c", ""),
    sym("d", "d", ""),
    sym("e", "e", "Euler's number"),
    sym("f", "f", ""),
    sym("g", "g", ""),
    sym("h", "h", ""),
    sym("i", "i", "Imaginary unit"),
    sym("j", "j", ""),
    sym("k", "k", ""),
    sym("m", "m", ""),
    sym("n", "n", ""),
    sym("p", "p", ""),
    sym("q", "q", ""),
    sym("r", "r", ""),
    sym("s", "s", ""),
    sym("t", "t", ""),
    sym("u", "u", ""),
    sym("v", "v", ""),
    sym("w", "w", ""),
    sym("x", "x", ""),
    sym("y", "y", ""),
    sym("z", "z", ""),
    sym(".", ".", "Decimal point"),
    sym(",", ",", "Comma"),
    sym("+", "+", "Plus"),
    sym("-", "-", "Minus"),
    sym("×", "\\times", "Multiplication"),
    sym("÷", "\\div", "Division"),
    sym("=", "=", "Equality"),
    sym("≠", "\\neq", "Inequality"),
    sym("<", "<", "Less than"),
    sym(">", ">", "Greater than"),
    sym("≤", "\\le", "Less than or equal to"),
    sym("≥", "\\ge", "Greater than or equal to"),
    sym("±", "\\pm", "Plus-minus"),
    sym("%", "%", "Percent"),
    sym("√", "\\sqrt", "Square root"),
    sym("^", "^", "Exponentiation"),
    sym("/", "/", "Fraction"),
    sym("(", "(", "Left parenthesis"),
    sym(")", ")", "Right parenthesis"),
    sym("[", "[", "Left bracket"),
    sym("]", "]", "Right bracket"),
    sym("{", "{", "Left brace"),
    sym("}", "}", "Right brace"),
    sym("π", "\\pi", "Pi"),
];

const LOGIC_AND_SETS: &[SymbolInfo] = &[
    sym("∀", "\\forall", "For all"),
    sym("∃", "\\exists", "There exists"),
    sym("¬", "\\neg", "Negation"),
    sym("∧", "\\wedge", "Conjunction"),
    sym("∨", "\\vee", "Disjunction"),
    sym("⇒", "\\implies", "Implication"),
    sym("⇔", "\\iff", "If and only if"),
    sym("∴", "\\therefore", "Therefore"),
    sym("∈", "\\in", "Element of"),
    sym("∉", "\\notin", "Not an element of"),
    sym("⊂", "\\subset", "Proper subset"),
    sym("⊆", "\\subseteq", "Subset"),
    sym("∪", "\\cup", "Union"),
    sym("∩", "\\cap", "Intersection"),
    sym("∖", "\\setminus", "Set difference"),
];

const ALGEBRA: &[SymbolInfo] = &[
    sym("∑", "\\sum", "Summation"),
    sym("∏", "\\prod", "Product"),
    sym("!", "!", "Factorial"),
    sym("ℕ", "\\mathbb{N}", "Natural numbers"),
    sym("ℤ", "\\mathbb{Z}", "Integers"),
    sym("ℚ", "\\mathbb{Q}", "Rational numbers"),
    sym("ℝ", "\\mathbb{R}", "Real numbers"),
    sym("ℂ", "\\mathbb{C}", "Complex numbers"),
];

const CALCULUS: &[SymbolInfo] = &[
    sym("∂", "\\partial", "Partial derivative"),
    sym("∫", "\\int", "Integral"),
    sym("∮", "\\oint", "Contour integral"),
    sym("∇", "\\nabla", "Nabla"),
    sym("Δ", "\\Delta", "Delta"),
    sym("ε", "\\epsilon", "Epsilon"),
    sym("δ", "\\delta", "Small delta"),
    sym("∞", "\\infty", "Infinity"),
];

const GEOMETRY: &[SymbolInfo] = &[
    sym("∠", "\\angle", "Angle"),
    sym("⊥", "\\perp", "Perpendicular"),
    sym("∥", "\\parallel", "Parallel"),
    sym("≅", "\\cong", "Congruent"),
    sym("∼", "\\sim", "Similar"),
    sym("θ", "\\theta", "Theta"),
    sym("φ", "\\phi", "Phi"),
    sym("α", "\\alpha", "Alpha"),
    sym("β", "\\beta", "Beta"),
    sym("μ", "\\mu", "Mu"),
    sym("σ", "\\sigma", "Sigma"),
];

pub const CATEGORIES: &[SymbolCategory] = &[
    SymbolCategory {
        name: "Basic Mathematics",
        items: BASIC,
    },
    SymbolCategory {
        name: "Logic and Set Theory",
        items: LOGIC_AND_SETS,
    },
    SymbolCategory {
        name: "Algebra and Number Theory",
        items: ALGEBRA,
    },
    SymbolCategory {
        name: "Calculus and Analysis",
        items: CALCULUS,
    },
    SymbolCategory {
        name: "Geometry and Trigonometry",
        items: GEOMETRY,
    },
];

/// Catalog entries in display order, first occurrence only.
pub fn ordered_symbols() -> Vec<SymbolInfo> {
    let mut seen = std::collections::HashSet::new();
    CATEGORIES
        .iter()
        .flat_map(|category| category.items.iter().copied())
        .filter(|info| seen.insert(info.symbol))
        .collect()
}

pub fn lookup(symbol: &str) -> Option<SymbolInfo> {
    CATEGORIES
        .iter()
        .flat_map(|category| category.items.iter())
        .find(|info| info.symbol == symbol)
        .copied()
}
