//! Fixed registry of supported languages and their starter templates.

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageDescriptor {
    /// Identifier sent to the runner as `language`.
    pub id: &'static str,
    pub label: &'static str,
    /// Extension including the leading dot.
    pub extension: &'static str,
    pub default_source: &'static str,
}

pub const LANGUAGES: [LanguageDescriptor; 5] = [
    LanguageDescriptor {
        id: "python",
        label: "Python",
        extension: ".py",
        default_source: "# Welcome to BuddyCode - Python Edition\nprint(\"Hello, World!\")",
    },
    LanguageDescriptor {
        id: "javascript",
        label: "JavaScript",
        extension: ".js",
        default_source: "// Welcome to BuddyCode - JavaScript Edition\nconsole.log(\"Hello, World!\");",
    },
    LanguageDescriptor {
        id: "java",
        label: "Java",
        extension: ".java",
        default_source: r#"// Welcome to BuddyCode - Java Edition
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#,
    },
    LanguageDescriptor {
        id: "cpp",
        label: "C++",
        extension: ".cpp",
        default_source: r#"// Welcome to BuddyCode - C++ Edition
#include <iostream>
#include <vector>
#include <string>

using namespace std;

int main() {
    cout << "Hello, World!" << endl;
    return 0;
}
"#,
    },
    LanguageDescriptor {
        id: "c",
        label: "C",
        extension: ".c",
        default_source: r#"// Welcome to BuddyCode - C Edition
#include <stdio.h>
#include <stdlib.h>

int main() {
    printf("Hello, World!\n");
    return 0;
}
"#,
    },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageCatalog;

impl LanguageCatalog {
    pub fn all(&self) -> &'static [LanguageDescriptor] {
        &LANGUAGES
    }

    pub fn get(&self, id: &str) -> Result<&'static LanguageDescriptor, SessionError> {
        LANGUAGES
            .iter()
            .find(|language| language.id == id)
            .ok_or_else(|| SessionError::UnknownLanguage(id.to_string()))
    }

    pub fn default_language(&self) -> &'static LanguageDescriptor {
        &LANGUAGES[0]
    }

    /// Name a saved buffer gets in the remote store.
    pub fn save_filename(language: &LanguageDescriptor) -> String {
        format!("code{}", language.extension)
    }
}
