//! Issue and verify tokens from the command line.
//!
//! Loads `.env` automatically if present, otherwise reads from the environment.
//!
//! ```bash
//! cargo run --example token -- user ada
//! cargo run --example token -- invite new@example.com acme
//! cargo run --example token -- verify eyJhbG...
//! ```

use axum_jwtauth::{Claims, JwtAuth, JwtConfig};

fn main() {
    dotenvy::dotenv().ok();

    let config = JwtConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let auth = JwtAuth::new(config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let issued = match args[0].as_str() {
        "user" => {
            let name = args.get(1).unwrap_or_else(|| usage());
            auth.issue_user_auth(Claims::new().set("name", name.as_str()))
        }
        "invite" => {
            let email = args.get(1).unwrap_or_else(|| usage());
            let organisation = args.get(2).map(String::as_str).unwrap_or("");
            auth.issue_invitation(email, organisation)
        }
        "verify" => {
            let token = args.get(1).unwrap_or_else(|| usage());
            match auth.decode(token) {
                Ok(t) => {
                    println!("Valid ({:?})\n", t.algorithm());
                    for (key, value) in t.claims.iter() {
                        println!("  {key:<12} : {value}");
                    }
                    if t.claims.is_expired() {
                        println!("\n  (expired)");
                    }
                }
                Err(e) => {
                    eprintln!("Failed: {e}");
                    std::process::exit(1);
                }
            }
            return;
        }
        _ => usage(),
    };

    match issued {
        Ok(token) => println!("{token}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  cargo run --example token -- user   <name>");
    eprintln!("  cargo run --example token -- invite <email> [organisation]");
    eprintln!("  cargo run --example token -- verify <token>");
    std::process::exit(1);
}
