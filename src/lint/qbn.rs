use super::{block_anchor, parameters};
use crate::diagnostics;
use crate::language::LanguageData;
use crate::parser::Quest;
use crate::symbols::{
    force_symbol_naming_conventions, symbol_follows_naming_conventions, Definitions, SymbolType,
    Task, TaskKind,
};
use tower_lsp::lsp_types::{Diagnostic, Range, Url};

const START_TIMER: &str = "start timer";

pub fn validate(quest: &Quest, language: &LanguageData, uri: &Url) -> Vec<Diagnostic> {
    let qbn = quest.qbn();
    if !qbn.found() {
        return vec![diagnostics::missing_block(block_anchor(quest), "QBN")];
    }

    let mut diagnostics = Vec::new();

    for (name, definitions) in qbn.symbols().iter() {
        duplicated(&mut diagnostics, name, definitions, |s| s.range, uri);

        for symbol in definitions.all() {
            match &symbol.signature {
                Some(signature) => diagnostics.extend(
                    signature
                        .iter()
                        .filter_map(|parameter| parameters::analyse(quest, language, parameter)),
                ),
                None => diagnostics.push(diagnostics::invalid_definition(
                    symbol.range,
                    name,
                    symbol.symbol_type.label(),
                )),
            }
        }

        let symbol = definitions.primary();
        if !qbn.is_symbol_referenced(name) {
            diagnostics.push(diagnostics::unused_symbol(symbol.range, name));
        }

        if symbol.symbol_type == SymbolType::Clock {
            let started = qbn.actions().iter().any(|action| {
                action.overload.starts_with(START_TIMER)
                    && action.signature.first().map(|p| p.value.as_str()) == Some(name)
            });
            if !started {
                diagnostics.push(diagnostics::unstarted_clock(symbol.range, name));
            }
            if !qbn.tasks().contains(name) {
                diagnostics.push(diagnostics::unlinked_clock(symbol.range, name));
            }
        }

        naming_convention(&mut diagnostics, name, symbol.range);
    }

    for (name, definitions) in qbn.tasks().iter() {
        duplicated(&mut diagnostics, name, definitions, |t| t.range, uri);

        let task = definitions.primary();
        if is_unused(quest, task) {
            let label = match task.kind {
                TaskKind::GlobalVarLink => task.global_var_name.as_deref().unwrap_or(name),
                _ => name,
            };
            diagnostics.push(diagnostics::unused_task(task.range, label));
        }

        naming_convention(&mut diagnostics, name, task.range);
    }

    for task in qbn.persist_until_tasks() {
        if !qbn.tasks().contains(&task.name) {
            diagnostics.push(diagnostics::undefined_until_performed(task.range, &task.name));
        }
    }

    for action in qbn.actions() {
        diagnostics.extend(
            action
                .signature
                .iter()
                .filter_map(|parameter| parameters::analyse(quest, language, parameter)),
        );
    }

    diagnostics.extend(
        qbn.failed_parse()
            .iter()
            .map(|range| diagnostics::undefined_expression(*range, "QBN")),
    );

    diagnostics::sort_by_line(&mut diagnostics);
    diagnostics
}

/// One error per definition after the first, linked to every other one.
fn duplicated<T>(
    diagnostics: &mut Vec<Diagnostic>,
    name: &str,
    definitions: &Definitions<T>,
    range_of: impl Fn(&T) -> Range,
    uri: &Url,
) {
    let all = definitions.all();
    for (index, duplicate) in all.iter().enumerate().skip(1) {
        let siblings = all
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, definition)| range_of(definition));
        diagnostics.push(diagnostics::duplicated_definition(
            range_of(duplicate),
            name,
            uri,
            siblings,
        ));
    }
}

fn is_unused(quest: &Quest, task: &Task) -> bool {
    let qbn = quest.qbn();
    if qbn.is_task_referenced(&task.name) {
        return false;
    }
    // A clock fires the task sharing its name.
    let linked_to_clock = qbn
        .symbol(&task.name)
        .is_some_and(|symbol| symbol.symbol_type == SymbolType::Clock);
    match task.kind {
        TaskKind::Standard => !task.triggered && !linked_to_clock,
        TaskKind::Variable | TaskKind::GlobalVarLink => true,
        TaskKind::PersistUntil => false,
    }
}

fn naming_convention(diagnostics: &mut Vec<Diagnostic>, name: &str, range: Range) {
    if !symbol_follows_naming_conventions(name) {
        diagnostics.push(diagnostics::naming_convention(
            range,
            name,
            &force_symbol_naming_conventions(name),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::code_of;

    fn lint(text: &str) -> Vec<Diagnostic> {
        let language = LanguageData::bundled().unwrap();
        let quest = Quest::parse_text(text, &language);
        let uri = Url::parse("file:///quests/TEST.txt").unwrap();
        validate(&quest, &language, &uri)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<(u32, &str)> {
        diagnostics
            .iter()
            .map(|d| (d.range.start.line, code_of(d).unwrap_or_default()))
            .collect()
    }

    fn count(diagnostics: &[Diagnostic], code: &str) -> usize {
        diagnostics.iter().filter(|d| code_of(d) == Some(code)).count()
    }

    #[test]
    fn referenced_symbols_are_not_unused() {
        let diagnostics = lint(
            "QBN:\nItem _gold_ gold range 1 to 1\nPerson _p_ group Questor\n\tgive item _gold_ to _p_\n",
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let diagnostics = lint("QBN:\nItem _gold_ gold range 1 to 1\n");
        assert_eq!(codes(&diagnostics), vec![(1, "unused-symbol")]);
        assert_eq!(
            diagnostics[0].tags,
            Some(vec![tower_lsp::lsp_types::DiagnosticTag::UNNECESSARY])
        );
    }

    #[test]
    fn undefined_symbol_covers_the_argument() {
        let text = "QBN:\nItem _note_ letter used 1011\n\tgive item _note_ to _vampleader_\n";
        let diagnostics = lint(text);
        let undefined: Vec<_> = diagnostics
            .iter()
            .filter(|d| code_of(d) == Some("undefined-symbol"))
            .collect();
        assert_eq!(undefined.len(), 1);

        let range = undefined[0].range;
        let line = text.lines().nth(2).unwrap();
        let covered = &line[range.start.character as usize..range.end.character as usize];
        assert_eq!(range.start.line, 2);
        assert_eq!(covered, "_vampleader_");
    }

    #[test]
    fn until_performed_references_tasks() {
        let diagnostics = lint(
            "QBN:\nfooTask task:\n\tend quest\n\nuntil fooTask performed:\n\tend quest\nuntil barTask performed:\n",
        );
        assert_eq!(count(&diagnostics, "unused-task"), 0);
        assert_eq!(count(&diagnostics, "undefined-until-performed"), 1);
        let undefined = diagnostics
            .iter()
            .find(|d| code_of(d) == Some("undefined-until-performed"))
            .unwrap();
        assert_eq!(undefined.range.start.line, 6);
    }

    #[test]
    fn duplicate_definitions_link_to_siblings() {
        let diagnostics = lint(
            "QBN:\nItem _a_ gold\nItem _a_ gold\nItem _a_ gold\n_t_ task:\n_t_ task:\n\tclear _a_\n\tstart task _t_\n",
        );
        let duplicates: Vec<_> = diagnostics
            .iter()
            .filter(|d| code_of(d) == Some("duplicated-definition"))
            .collect();
        let lines: Vec<_> = duplicates.iter().map(|d| d.range.start.line).collect();
        assert_eq!(lines, vec![2, 3, 5]);

        let related: Vec<_> = duplicates[0]
            .related_information
            .as_ref()
            .unwrap()
            .iter()
            .map(|r| r.location.range.start.line)
            .collect();
        assert_eq!(related, vec![1, 3]);
        assert_eq!(duplicates[2].related_information.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn checks_clock_links() {
        let diagnostics = lint("QBN:\nClock _c_ 00:30\n\tclicked npc _c_\n");
        let found: Vec<_> = codes(&diagnostics)
            .into_iter()
            .filter(|(_, code)| code.ends_with("clock"))
            .collect();
        assert_eq!(found, vec![(1, "unstarted-clock"), (1, "unlinked-clock")]);

        let diagnostics = lint("QBN:\nClock _c_ 00:30\n\tstart timer _c_\n\n_c_ task:\n\tend quest\n");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn reports_unused_tasks_and_variables() {
        let diagnostics = lint(
            "QBN:\nItem _i_ gold\n_plain_ task:\n\tend quest\n_cond_ task:\n\tclicked item _i_\nvariable _flag_\nQuestor_Met _met_\n",
        );
        let unused: Vec<_> = diagnostics
            .iter()
            .filter(|d| code_of(d) == Some("unused-task"))
            .map(|d| (d.range.start.line, d.message.as_str()))
            .collect();
        assert_eq!(
            unused,
            vec![
                (2, "Task '_plain_' is never triggered or referenced."),
                (6, "Task '_flag_' is never triggered or referenced."),
                (7, "Task 'Questor_Met' is never triggered or referenced."),
            ]
        );
    }

    #[test]
    fn hints_naming_conventions() {
        let diagnostics = lint("QBN:\nItem gold gold\n\tget item gold\n");
        assert_eq!(codes(&diagnostics), vec![(1, "naming-convention")]);
        assert_eq!(diagnostics[0].message, "'gold' should be named '_gold_'.");
    }

    #[test]
    fn analyses_action_and_definition_parameters() {
        let diagnostics = lint(
            "QBN:\nFoe _f_ is Dragon\nItem _i_ foo bar\n\tcreate foe _f_ every +5 minutes 1 times with 100 success\n\tget item _i_\n\tcast Fly spell on _f_\n",
        );
        assert_eq!(
            codes(&diagnostics),
            vec![
                (1, "undefined-attribute"),
                (2, "invalid-definition"),
                (3, "signed-natural-number"),
                (5, "undefined-effect-key"),
            ]
        );
    }

    #[test]
    fn reports_lines_that_match_nothing() {
        let diagnostics = lint("QBN:\ndance with everyone\n");
        assert_eq!(codes(&diagnostics), vec![(1, "undefined-expression")]);
        assert_eq!(diagnostics[0].message, "Undefined expression in QBN block.");
    }
}
