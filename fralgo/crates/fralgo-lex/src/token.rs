//! Token definitions for the Algo language.
//!
//! Keywords are French and case sensitive (`Si`, `FinSi`, `Procédure`…).
//! The newline is a significant token: it terminates statements. Tokens
//! render back to their source lexeme through `Display`, which is what
//! syntax errors show between `>` and `<` (a newline renders as `↵`).

use std::fmt;

/// A lexical unit of an Algo source.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // =========================================================================
    // DECLARATIONS
    // =========================================================================
    /// "Variable" - single scalar declaration
    Variable,
    /// "Variables" - multiple scalar declaration
    Variables,
    /// "Tableau" - array declaration
    Tableau,
    /// "Tableaux" - multiple array declaration
    Tableaux,
    /// "Redim" - array resize statement
    Redim,
    /// "Table" - associative table declaration, or table literal opener
    Table,
    /// "FinTable" - table literal terminator
    FinTable,
    /// "Structure" - record type declaration opener
    Structure,
    /// "FinStructure"
    FinStructure,
    /// "Constante" - constant declaration
    Constante,
    /// "Importer" - library import
    Importer,
    /// "Alias" - import alias
    Alias,
    /// "Librairie" - library file header
    Librairie,
    /// "Initialise" - library initialisation block
    Initialise,
    /// "en" - type annotation separator
    En,

    // =========================================================================
    // CALLABLES
    // =========================================================================
    /// "Fonction"
    Fonction,
    /// "FinFonction"
    FinFonction,
    /// "Procédure"
    Procedure,
    /// "FinProcédure"
    FinProcedure,
    /// "Retourne"
    Retourne,

    // =========================================================================
    // PROGRAM STRUCTURE AND CONTROL FLOW
    // =========================================================================
    /// "Début" - main block opener
    Debut,
    /// "Fin" - main block terminator
    Fin,
    /// "Si"
    Si,
    /// "Alors"
    Alors,
    /// "Sinon"
    Sinon,
    /// "SinonSi"
    SinonSi,
    /// "FinSi"
    FinSi,
    /// "TantQue"
    TantQue,
    /// "FinTantQue"
    FinTantQue,
    /// "Pour"
    Pour,
    /// "à" - for-loop bound separator
    A,
    /// "Pas" - for-loop step
    Pas,
    /// "Suivant" - for-loop terminator
    Suivant,
    /// "Continuer" - next loop iteration
    Continuer,
    /// "Sortir" - leave the enclosing loop
    Sortir,
    /// "Panique" - raise an uncatchable panic
    Panique,

    // =========================================================================
    // INPUT / OUTPUT
    // =========================================================================
    /// "Ecrire" - print to standard output
    Ecrire,
    /// "EcrireErr" - print to standard error
    EcrireErr,
    /// "Lire" - read a line from standard input
    Lire,
    /// "Dormir" - sleep
    Dormir,

    // =========================================================================
    // FILES
    // =========================================================================
    /// "Ouvrir"
    Ouvrir,
    /// "Fermer"
    Fermer,
    /// "LireFichier"
    LireFichier,
    /// "EcrireFichier"
    EcrireFichier,
    /// "FDF" - end-of-file predicate
    Fdf,
    /// "sur" - channel designator in Ouvrir
    Sur,
    /// "Lecture" - read mode
    Lecture,
    /// "Ecriture" - write mode
    Ecriture,
    /// "Ajout" - append mode
    Ajout,

    // =========================================================================
    // TYPES
    // =========================================================================
    /// "Booléen"
    TypeBooleen,
    /// "Caractère"
    TypeCaractere,
    /// "Chaîne"
    TypeChaine,
    /// "Entier"
    TypeEntier,
    /// "Numérique"
    TypeNumerique,
    /// "Quelconque" - accepts any type
    TypeQuelconque,

    // =========================================================================
    // BUILT-IN FUNCTIONS
    // =========================================================================
    /// "Longueur"
    Longueur,
    /// "Taille"
    Taille,
    /// "Extraire"
    Extraire,
    /// "Gauche"
    Gauche,
    /// "Droite"
    Droite,
    /// "Trouve"
    Trouve,
    /// "Car"
    Car,
    /// "CodeCar"
    CodeCar,
    /// "Aléa"
    Alea,
    /// "TempsUnix"
    TempsUnix,
    /// "Type"
    TypeOf,
    /// "Clef" - nth table key
    Clef,
    /// "Clefs" - array of table keys
    Clefs,
    /// "Valeur" - table value for a key
    Valeur,
    /// "Valeurs" - array of table values
    Valeurs,
    /// "Existe" - table key membership
    Existe,

    // =========================================================================
    // LOGICAL AND ARITHMETIC WORD OPERATORS
    // =========================================================================
    /// "ET" - logical and
    Et,
    /// "OU" - logical or
    Ou,
    /// "OUX" - logical exclusive or
    Oux,
    /// "NON" - logical not
    Non,
    /// "DP" - divisibility (a DP b ⇔ a mod b = 0)
    Dp,

    // =========================================================================
    // LITERALS AND IDENTIFIERS
    // =========================================================================
    /// Integer literal
    Integer(i64),
    /// Float literal (`d+.d+`)
    Float(f64),
    /// String literal, escapes decoded
    Str(String),
    /// "VRAI"
    True,
    /// "FAUX"
    False,
    /// Identifier; a leading `@` marks a namespace-private name
    Ident(String),

    // =========================================================================
    // OPERATORS AND PUNCTUATION
    // =========================================================================
    /// "+"
    Plus,
    /// "-"
    Minus,
    /// "*"
    Star,
    /// "/"
    Slash,
    /// "%"
    Percent,
    /// "^"
    Caret,
    /// "&" - concatenation, or reference marker in parameter position
    Ampersand,
    /// "="
    Eq,
    /// "<>"
    Ne,
    /// ">"
    Gt,
    /// ">="
    Ge,
    /// "<"
    Lt,
    /// "<="
    Le,
    /// "←" (or its ASCII alias "<-") - assignment
    Arrow,
    /// "("
    LParen,
    /// ")"
    RParen,
    /// "["
    LBracket,
    /// "]"
    RBracket,
    /// ","
    Comma,
    /// "."
    Dot,
    /// ":" - namespace qualifier
    Colon,
    /// "\\" - newline suppression in Ecrire
    Backslash,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Statement terminator (one per run of blank lines)
    Newline,
    /// End of input
    Eof,
}

impl Token {
    /// Maps an identifier lexeme to its keyword token, if reserved.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "Variable" => Token::Variable,
            "Variables" => Token::Variables,
            "Tableau" => Token::Tableau,
            "Tableaux" => Token::Tableaux,
            "Redim" => Token::Redim,
            "Table" => Token::Table,
            "FinTable" => Token::FinTable,
            "Structure" => Token::Structure,
            "FinStructure" => Token::FinStructure,
            "Constante" => Token::Constante,
            "Importer" => Token::Importer,
            "Alias" => Token::Alias,
            "Librairie" => Token::Librairie,
            "Initialise" => Token::Initialise,
            "en" => Token::En,
            "Fonction" => Token::Fonction,
            "FinFonction" => Token::FinFonction,
            "Procédure" => Token::Procedure,
            "FinProcédure" => Token::FinProcedure,
            "Retourne" => Token::Retourne,
            "Début" => Token::Debut,
            "Fin" => Token::Fin,
            "Si" => Token::Si,
            "Alors" => Token::Alors,
            "Sinon" => Token::Sinon,
            "SinonSi" => Token::SinonSi,
            "FinSi" => Token::FinSi,
            "TantQue" => Token::TantQue,
            "FinTantQue" => Token::FinTantQue,
            "Pour" => Token::Pour,
            "à" => Token::A,
            "Pas" => Token::Pas,
            "Suivant" => Token::Suivant,
            "Continuer" => Token::Continuer,
            "Sortir" => Token::Sortir,
            "Panique" => Token::Panique,
            "Ecrire" => Token::Ecrire,
            "EcrireErr" => Token::EcrireErr,
            "Lire" => Token::Lire,
            "Dormir" => Token::Dormir,
            "Ouvrir" => Token::Ouvrir,
            "Fermer" => Token::Fermer,
            "LireFichier" => Token::LireFichier,
            "EcrireFichier" => Token::EcrireFichier,
            "FDF" => Token::Fdf,
            "sur" => Token::Sur,
            "Lecture" => Token::Lecture,
            "Ecriture" => Token::Ecriture,
            "Ajout" => Token::Ajout,
            "Booléen" => Token::TypeBooleen,
            "Caractère" => Token::TypeCaractere,
            "Chaîne" => Token::TypeChaine,
            "Entier" => Token::TypeEntier,
            "Numérique" => Token::TypeNumerique,
            "Quelconque" => Token::TypeQuelconque,
            "Longueur" => Token::Longueur,
            "Taille" => Token::Taille,
            "Extraire" => Token::Extraire,
            "Gauche" => Token::Gauche,
            "Droite" => Token::Droite,
            "Trouve" => Token::Trouve,
            "Car" => Token::Car,
            "CodeCar" => Token::CodeCar,
            "Aléa" => Token::Alea,
            "TempsUnix" => Token::TempsUnix,
            "Type" => Token::TypeOf,
            "Clef" => Token::Clef,
            "Clefs" => Token::Clefs,
            "Valeur" => Token::Valeur,
            "Valeurs" => Token::Valeurs,
            "Existe" => Token::Existe,
            "ET" => Token::Et,
            "OU" => Token::Ou,
            "OUX" => Token::Oux,
            "NON" => Token::Non,
            "DP" => Token::Dp,
            "VRAI" => Token::True,
            "FAUX" => Token::False,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    /// Renders the source lexeme of the token, the form shown in
    /// `Erreur de syntaxe >…<` messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Variable => "Variable",
            Token::Variables => "Variables",
            Token::Tableau => "Tableau",
            Token::Tableaux => "Tableaux",
            Token::Redim => "Redim",
            Token::Table => "Table",
            Token::FinTable => "FinTable",
            Token::Structure => "Structure",
            Token::FinStructure => "FinStructure",
            Token::Constante => "Constante",
            Token::Importer => "Importer",
            Token::Alias => "Alias",
            Token::Librairie => "Librairie",
            Token::Initialise => "Initialise",
            Token::En => "en",
            Token::Fonction => "Fonction",
            Token::FinFonction => "FinFonction",
            Token::Procedure => "Procédure",
            Token::FinProcedure => "FinProcédure",
            Token::Retourne => "Retourne",
            Token::Debut => "Début",
            Token::Fin => "Fin",
            Token::Si => "Si",
            Token::Alors => "Alors",
            Token::Sinon => "Sinon",
            Token::SinonSi => "SinonSi",
            Token::FinSi => "FinSi",
            Token::TantQue => "TantQue",
            Token::FinTantQue => "FinTantQue",
            Token::Pour => "Pour",
            Token::A => "à",
            Token::Pas => "Pas",
            Token::Suivant => "Suivant",
            Token::Continuer => "Continuer",
            Token::Sortir => "Sortir",
            Token::Panique => "Panique",
            Token::Ecrire => "Ecrire",
            Token::EcrireErr => "EcrireErr",
            Token::Lire => "Lire",
            Token::Dormir => "Dormir",
            Token::Ouvrir => "Ouvrir",
            Token::Fermer => "Fermer",
            Token::LireFichier => "LireFichier",
            Token::EcrireFichier => "EcrireFichier",
            Token::Fdf => "FDF",
            Token::Sur => "sur",
            Token::Lecture => "Lecture",
            Token::Ecriture => "Ecriture",
            Token::Ajout => "Ajout",
            Token::TypeBooleen => "Booléen",
            Token::TypeCaractere => "Caractère",
            Token::TypeChaine => "Chaîne",
            Token::TypeEntier => "Entier",
            Token::TypeNumerique => "Numérique",
            Token::TypeQuelconque => "Quelconque",
            Token::Longueur => "Longueur",
            Token::Taille => "Taille",
            Token::Extraire => "Extraire",
            Token::Gauche => "Gauche",
            Token::Droite => "Droite",
            Token::Trouve => "Trouve",
            Token::Car => "Car",
            Token::CodeCar => "CodeCar",
            Token::Alea => "Aléa",
            Token::TempsUnix => "TempsUnix",
            Token::TypeOf => "Type",
            Token::Clef => "Clef",
            Token::Clefs => "Clefs",
            Token::Valeur => "Valeur",
            Token::Valeurs => "Valeurs",
            Token::Existe => "Existe",
            Token::Et => "ET",
            Token::Ou => "OU",
            Token::Oux => "OUX",
            Token::Non => "NON",
            Token::Dp => "DP",
            Token::True => "VRAI",
            Token::False => "FAUX",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Caret => "^",
            Token::Ampersand => "&",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Arrow => "←",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Colon => ":",
            Token::Backslash => "\\",
            Token::Newline => "↵",
            Token::Eof => "fin de fichier",
            Token::Integer(n) => return write!(f, "{n}"),
            Token::Float(x) => return write!(f, "{x}"),
            Token::Str(s) => return write!(f, "{s}"),
            Token::Ident(name) => return write!(f, "{name}"),
        };
        f.write_str(text)
    }
}

/// A token together with the line it starts on.
#[derive(Clone, Debug, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: u32,
}

impl Lexeme {
    pub fn new(token: Token, line: u32) -> Self {
        Self { token, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Token::keyword("Procédure"), Some(Token::Procedure));
        assert_eq!(Token::keyword("à"), Some(Token::A));
        assert_eq!(Token::keyword("VRAI"), Some(Token::True));
        assert_eq!(Token::keyword("variable"), None);
        assert_eq!(Token::keyword("total"), None);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(Token::keyword("si"), None);
        assert_eq!(Token::keyword("SI"), None);
        assert_eq!(Token::keyword("Si"), Some(Token::Si));
    }

    #[test]
    fn test_display_renders_lexeme() {
        assert_eq!(Token::FinTantQue.to_string(), "FinTantQue");
        assert_eq!(Token::Arrow.to_string(), "←");
        assert_eq!(Token::Newline.to_string(), "↵");
        assert_eq!(Token::Integer(42).to_string(), "42");
        assert_eq!(Token::Ident("moyenne".into()).to_string(), "moyenne");
    }
}
