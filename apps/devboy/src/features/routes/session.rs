use std::io::{BufRead, Write};

use devboy_types::{Method, Registry};

use super::registrar::{validate_path, NewRoute, Registrar};
use super::resolver::FunctionSelection;
use super::uniqueness;
use crate::features::prompt::Prompter;

/// Interactive route creation: prompts for path, method and function, asks
/// again after duplicates or invalid input, and keeps going while the user
/// wants another route. Returns how many routes were created.
pub fn run<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    registrar: &Registrar,
    mut registry: Registry,
) -> anyhow::Result<usize> {
    let methods: Vec<String> = Method::ALL.iter().map(|m| m.as_str().to_string()).collect();
    let mut created = 0;

    loop {
        let path = prompter.input("Enter the route path (e.g., /users/get_profile):", |input| {
            validate_path(input).map_err(|err| err.to_string())
        })?;
        let method = Method::ALL[prompter.select("Select the HTTP method:", &methods, 0)?];

        if uniqueness::is_duplicate(&registry, &path, method) {
            prompter.say(&format!("Route {path} with method {method} already exists."))?;
            if !prompter.confirm("Do you want to enter a different route?", true)? {
                break;
            }
            continue;
        }

        let function = select_function(prompter, &registry)?;
        let req = NewRoute {
            path,
            method,
            function,
        };
        match registrar.add_route(&registry, &req) {
            Ok(added) => {
                prompter.say(&format!(
                    "Route {} created successfully and added to {} function.",
                    added.route.path, added.function
                ))?;
                registry = added.registry;
                created += 1;
            }
            Err(err) if err.is_recoverable() => {
                prompter.say(&format!(">> {err}"))?;
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        if !prompter.confirm("Do you want to create another route?", false)? {
            break;
        }
    }

    Ok(created)
}

fn select_function<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    registry: &Registry,
) -> anyhow::Result<FunctionSelection> {
    let existing: Vec<String> = registry.custom_functions().map(str::to_string).collect();
    let mut choices = vec!["Default function".to_string()];
    choices.extend(existing.iter().map(|name| format!("Existing function: {name}")));
    choices.push("Create a new function".to_string());

    let picked = prompter.select("Which function should handle this route?", &choices, 0)?;
    if picked == 0 {
        return Ok(FunctionSelection::Default);
    }
    if let Some(name) = existing.get(picked - 1) {
        return Ok(FunctionSelection::Existing(name.clone()));
    }

    let name = prompter.input("Enter a name for the new function:", |input| {
        let name = input.trim();
        if name.is_empty() {
            Err("Function name cannot be empty. Please enter a valid name.".into())
        } else if registry.contains(name) {
            Err("A function with this name already exists. Please choose a different name.".into())
        } else {
            Ok(())
        }
    })?;
    Ok(FunctionSelection::New(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::registry::RegistryStore;
    use devboy_types::{FunctionEntry, DEFAULT_FUNCTION};
    use std::io::Cursor;

    fn setup() -> (tempfile::TempDir, Registrar) {
        let tmp = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(tmp.path().join("devboy.config.json"));
        let registrar = Registrar::new(store, tmp.path());
        (tmp, registrar)
    }

    fn answers(lines: &[&str]) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        let mut script = lines.join("\n");
        script.push('\n');
        Prompter::new(Cursor::new(script.into_bytes()), Vec::new())
    }

    #[test]
    fn duplicate_route_asks_again_instead_of_aborting() {
        let (_tmp, registrar) = setup();
        let mut prompter = answers(&[
            "/a", "1", "", "y", // GET /a on the default function, create another
            "/a", "1", "y", // duplicate, enter a different route
            "/b", "2", "2", "jobs", "n", // POST /b on a new function, stop
        ]);

        let created = run(&mut prompter, &registrar, Registry::new()).unwrap();

        assert_eq!(created, 2);
        let registry = registrar.store().load().unwrap();
        assert_eq!(registry.get(DEFAULT_FUNCTION).unwrap().routes.len(), 1);
        let jobs = registry.get("jobs").unwrap();
        assert_eq!(jobs.routes[0].path, "/b");
        assert_eq!(jobs.routes[0].method, Method::Post);

        let out = String::from_utf8(prompter.into_output()).unwrap();
        assert!(out.contains("Route /a with method GET already exists."));
    }

    #[test]
    fn existing_functions_are_offered() {
        let (_tmp, registrar) = setup();
        let mut registry = Registry::new();
        registry.insert_function("jobs", FunctionEntry::new("jobs.js"));
        let mut prompter = answers(&["/c", "3", "2", "n"]);

        run(&mut prompter, &registrar, registry).unwrap();

        let registry = registrar.store().load().unwrap();
        assert_eq!(registry.get("jobs").unwrap().routes[0].path, "/c");
        assert_eq!(registry.get("jobs").unwrap().routes[0].method, Method::Put);
        let out = String::from_utf8(prompter.into_output()).unwrap();
        assert!(out.contains("2) Existing function: jobs"));
        assert!(out.contains("3) Create a new function"));
    }

    #[test]
    fn invalid_path_and_taken_name_are_asked_again() {
        let (_tmp, registrar) = setup();
        let mut registry = Registry::new();
        registry.insert_function("jobs", FunctionEntry::new("jobs.js"));
        let mut prompter = answers(&["users", "/users/", "/users", "1", "3", "jobs", " ", "reports", "n"]);

        let created = run(&mut prompter, &registrar, registry).unwrap();

        assert_eq!(created, 1);
        let registry = registrar.store().load().unwrap();
        assert_eq!(registry.get("reports").unwrap().routes[0].path, "/users");
        let out = String::from_utf8(prompter.into_output()).unwrap();
        assert!(out.contains("must start with"));
        assert!(out.contains("empty segments"));
        assert!(out.contains("A function with this name already exists."));
        assert!(out.contains("Function name cannot be empty."));
    }

    #[test]
    fn declining_to_retry_after_duplicate_stops() {
        let (_tmp, registrar) = setup();
        let first = registrar
            .add_route(
                &Registry::new(),
                &NewRoute {
                    path: "/a".into(),
                    method: Method::Get,
                    function: FunctionSelection::Default,
                },
            )
            .unwrap();
        let mut prompter = answers(&["/a", "1", "n"]);

        let created = run(&mut prompter, &registrar, first.registry).unwrap();

        assert_eq!(created, 0);
        assert_eq!(registrar.store().load().unwrap().route_count(), 1);
    }
}
