//! fralgo-par - AST node definitions.
//!
//! The tree the evaluator walks. Statements carry the line they start on
//! so runtime errors can be located (`-v- Ligne n`).
//!
//! Accesses like `a.b[i].c` are canonicalized into a single [`Path`]
//! node - a base name plus an ordered list of accessors - instead of
//! being spread over distinct field/index productions, and are read or
//! written in one walk.

use crate::types::TypeSpec;

/// A parsed source, in one of the four recognized forms.
#[derive(Debug, Clone)]
pub enum Program {
    /// `Librairie` header, declarations, optional `Initialise` block.
    Library { decls: Block, init: Option<Block> },

    /// Declarations followed by `Début … Fin`.
    Main { decls: Block, body: Block },

    /// A bare declaration list (the body of an imported library).
    Declarations(Block),

    /// Free statements - the interactive form.
    Statements(Block),
}

/// A statement sequence.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

/// A statement together with its source line.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

/// Every statement kind, declarations included: declarations are
/// ordinary statements so they can appear in function bodies and at the
/// shell prompt.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `Variable x en T` / `Variables a, b en T`
    Declare { names: Vec<String>, ty: TypeSpec },

    /// `Tableau t[2,3] en T` / `Tableaux t[], u[5] en T`
    DeclareArray {
        arrays: Vec<(String, Vec<i64>)>,
        elem: TypeSpec,
    },

    /// `Table t en K, V`
    DeclareTable {
        name: String,
        key: TypeSpec,
        value: TypeSpec,
    },

    /// `Constante NOM ← expression`
    DeclareConst { name: String, value: Expr },

    /// `Structure Nom … FinStructure`
    DeclareStruct {
        name: String,
        fields: Vec<(String, TypeSpec)>,
    },

    /// `Fonction … FinFonction` / `Procédure … FinProcédure`
    Function(FunctionDef),

    /// `Importer "lib" [Alias nom]`
    Import { lib: String, alias: Option<String> },

    /// `cible ← expression` (scalar, array element, record field, table
    /// entry - anything a path can designate)
    Assign { target: Path, value: Expr },

    /// `cible ← v1, v2, …` - record fill with one value per field.
    AssignSeq { target: Path, values: Vec<Expr> },

    /// `Ecrire …` / `EcrireErr …`; a trailing `\` suppresses the newline.
    Print {
        args: Vec<Expr>,
        newline: bool,
        err: bool,
    },

    /// `Lire cible`
    Read { target: Path },

    /// `Redim t[n, …]`
    Resize { target: Path, dims: Vec<Expr> },

    /// `Ouvrir nom sur canal en Mode`
    OpenFile {
        filename: Expr,
        channel: Expr,
        mode: FileMode,
    },

    /// `Fermer canal`
    CloseFile { channel: Expr },

    /// `LireFichier canal, cible`
    ReadFile { channel: Expr, target: Path },

    /// `EcrireFichier canal, expression`
    WriteFile { channel: Expr, value: Expr },

    /// `Si … Alors … SinonSi … Sinon … FinSi`; one arm per condition.
    If {
        arms: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },

    /// `TantQue … FinTantQue`
    While { cond: Expr, body: Block },

    /// `Pour v ← a à b [Pas s] … v Suivant`. The name after `Suivant`
    /// must match the loop variable; the evaluator enforces it.
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
        next_var: String,
    },

    /// `Retourne expression`
    Return(Expr),

    /// `Panique expression`
    Panic(Expr),

    /// `Continuer`
    Continue,

    /// `Sortir`
    Exit,

    /// `Dormir(expression)`
    Sleep(Expr),

    /// An expression at statement position (procedure calls mostly).
    Expr(Expr),
}

/// File access modes of `Ouvrir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// `Lecture`
    Read,
    /// `Ecriture`
    Write,
    /// `Ajout`
    Append,
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileMode::Read => f.write_str("Lecture"),
            FileMode::Write => f.write_str("Ecriture"),
            FileMode::Append => f.write_str("Ajout"),
        }
    }
}

/// A function or procedure definition (procedures have no return type).
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub return_type: Option<TypeSpec>,
}

impl FunctionDef {
    pub fn is_procedure(&self) -> bool {
        self.return_type.is_none()
    }
}

/// A declared parameter. `by_ref` parameters (`&nom`) bind to the
/// caller's variable through the reference map instead of copying.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeSpec,
    pub by_ref: bool,
}

/// A canonical access path: `base`, optionally namespace-qualified,
/// followed by `.field` and `[index, …]` accessors in source order.
#[derive(Debug, Clone)]
pub struct Path {
    pub namespace: Option<String>,
    pub base: String,
    pub accessors: Vec<Accessor>,
}

impl Path {
    /// A bare variable path.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            base: name.into(),
            accessors: Vec::new(),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.accessors.is_empty()
    }
}

/// One step of an access path.
#[derive(Debug, Clone)]
pub enum Accessor {
    /// `.champ`
    Field(String),
    /// `[i, j, …]` - indexes are full expressions.
    Index(Vec<Expr>),
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `VRAI` / `FAUX`
    Bool(bool),

    /// Integer literal
    Int(i64),

    /// Float literal
    Float(f64),

    /// String literal
    Str(String),

    /// A variable, field or element read through a path.
    Path(Path),

    /// `&variable` - a reference argument.
    Reference(String),

    /// `[e1, e2, …]` - nested for multidimensional arrays.
    ArrayLit(Vec<Expr>),

    /// `Table` … `clé, valeur` … `FinTable`
    TableLit(Vec<(Expr, Expr)>),

    /// Binary operation.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `NON(e)`
    Not(Box<Expr>),

    /// Unary minus.
    Neg(Box<Expr>),

    /// A function or procedure call, optionally namespace-qualified.
    Call {
        namespace: Option<String>,
        name: String,
        args: Vec<Expr>,
    },

    /// A built-in function.
    Builtin(Builtin),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// `DP` - divisibility: `a DP b` ⇔ `a mod b = 0`.
    DivBy,
    /// `&` - string concatenation.
    Concat,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Xor,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::DivBy => "DP",
            BinOp::Concat => "&",
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::And => "ET",
            BinOp::Or => "OU",
            BinOp::Xor => "OUX",
        };
        f.write_str(text)
    }
}

/// Built-in functions of the language core.
#[derive(Debug, Clone)]
pub enum Builtin {
    /// `Longueur(e)` - string length, or count of assigned array elements.
    Len(Box<Expr>),
    /// `Taille(e)` - array size(s), sized-char capacity, table entry count.
    SizeOf(Box<Expr>),
    /// `Extraire(c, début, longueur)` - 1-based substring.
    Mid(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `Gauche(c, n)`
    Left(Box<Expr>, Box<Expr>),
    /// `Droite(c, n)`
    Right(Box<Expr>, Box<Expr>),
    /// `Trouve(c, sous)` - 1-based position, 0 when absent.
    Find(Box<Expr>, Box<Expr>),
    /// `Car(n)`
    Chr(Box<Expr>),
    /// `CodeCar(c)`
    Ord(Box<Expr>),
    /// `Aléa()`
    Random,
    /// `TempsUnix()`
    UnixTime,
    /// `Entier(e)`
    ToInteger(Box<Expr>),
    /// `Numérique(e)`
    ToFloat(Box<Expr>),
    /// `Chaîne(e)`
    ToString(Box<Expr>),
    /// `Booléen(e)`
    ToBoolean(Box<Expr>),
    /// `Type(e)`
    TypeOf(Box<Expr>),
    /// `FDF(canal)`
    Eof(Box<Expr>),
    /// `Existe(t, clé)`
    Exists(Box<Expr>, Box<Expr>),
    /// `Clef(t, i)` - i-th key, in insertion order.
    KeyAt(Box<Expr>, Box<Expr>),
    /// `Valeur(t, clé)`
    ValueFor(Box<Expr>, Box<Expr>),
    /// `Clefs(t)`
    Keys(Box<Expr>),
    /// `Valeurs(t)`
    Values(Box<Expr>),
}
