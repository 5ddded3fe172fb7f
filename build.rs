use std::process::Command;

fn main() {
    // Only rebuild CSS when template or CSS files change
    println!("cargo:rerun-if-changed=assets/css/input.css");
    println!("cargo:rerun-if-changed=templates/");

    // Try to run Tailwind CSS standalone CLI
    let status = Command::new("tailwindcss")
        .args([
            "-i",
            "assets/css/input.css",
            "-o",
            "assets/css/output.css",
            "--minify",
        ])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Tailwind CSS compiled successfully");
        }
        _ => {
            // Tailwind CLI not available — write a small fallback stylesheet
            println!("cargo:warning=Tailwind CLI not found, using fallback CSS");
            let fallback = r#"*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #111827; background: #f9fafb; -webkit-font-smoothing: antialiased; }
.page { min-height: 100vh; }
.container { max-width: 56rem; margin: 0 auto; padding: 2rem 1rem; }
.container-narrow { max-width: 28rem; margin: 0 auto; padding: 3rem 1rem; }
.container-wide { max-width: 80rem; margin: 0 auto; padding: 2rem 1rem; }
.center { text-align: center; }
.muted { color: #6b7280; }
.small { font-size: 0.875rem; }
.title { font-size: 1.875rem; font-weight: 800; margin-bottom: 0.5rem; }
.subtitle { font-size: 1.125rem; color: #6b7280; margin-bottom: 2rem; }
.header { display: flex; align-items: center; justify-content: space-between; padding: 1.5rem 0; border-bottom: 1px solid #e5e7eb; margin-bottom: 2rem; }
.nav { display: flex; gap: 1.5rem; align-items: center; padding: 1rem 0; border-bottom: 1px solid #e5e7eb; }
.nav a { font-size: 0.875rem; font-weight: 500; }
.badge { display: inline-block; background: #eef2ff; color: #4f46e5; border-radius: 9999px; padding: 0.25rem 0.75rem; font-size: 0.75rem; font-weight: 500; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); gap: 1.5rem; margin-bottom: 2rem; }
.stack { display: grid; gap: 2rem; max-width: 45rem; margin: 0 auto; }
.card { background: #fff; border: 1px solid #e5e7eb; border-radius: 0.75rem; padding: 1.5rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); }
.card.selected { border-color: #4f46e5; background: #eef2ff; }
.card h3 { font-size: 1.125rem; font-weight: 600; margin-bottom: 0.5rem; }
.card .thumb { width: 100%; aspect-ratio: 16 / 9; object-fit: cover; border-radius: 0.5rem; margin-bottom: 1rem; background: #e5e7eb; }
.avatar { width: 2.5rem; height: 2.5rem; border-radius: 9999px; object-fit: cover; border: 1px solid #e5e7eb; }
.avatar-fallback { width: 2.5rem; height: 2.5rem; border-radius: 9999px; background: #e5e7eb; display: inline-flex; align-items: center; justify-content: center; font-weight: 600; color: #6b7280; }
.byline { display: flex; align-items: center; gap: 0.75rem; margin-bottom: 0.75rem; }
.meta { display: flex; align-items: center; justify-content: space-between; margin-top: 1rem; }
.btn { display: inline-flex; align-items: center; justify-content: center; padding: 0.5rem 1.25rem; border-radius: 0.5rem; font-size: 0.875rem; font-weight: 500; border: none; cursor: pointer; text-decoration: none; transition: background 0.15s; }
.btn-primary { background: #4f46e5; color: #fff; }
.btn-primary:hover { background: #4338ca; }
.btn-primary:disabled { opacity: 0.5; cursor: not-allowed; }
.btn-secondary { background: #fff; color: #111827; border: 1px solid #d1d5db; }
.btn-secondary:hover { background: #f3f4f6; }
.btn-danger { background: #fff; color: #dc2626; border: 1px solid #fca5a5; }
.btn-danger:hover { background: #fef2f2; }
.form { display: grid; gap: 1.25rem; }
.form label { display: block; font-size: 0.875rem; font-weight: 500; margin-bottom: 0.35rem; }
.form input, .form textarea, .form select { width: 100%; padding: 0.6rem 0.8rem; border: 1px solid #d1d5db; border-radius: 0.5rem; font-size: 0.875rem; background: #fff; }
.form input:focus, .form textarea:focus, .form select:focus { outline: 2px solid #4f46e5; border-color: transparent; }
.error { background: #fef2f2; border: 1px solid #fecaca; color: #dc2626; border-radius: 0.5rem; padding: 0.75rem 1rem; font-size: 0.875rem; margin-bottom: 1rem; }
.notice { background: #f0fdf4; border: 1px solid #bbf7d0; color: #16a34a; border-radius: 0.5rem; padding: 0.75rem 1rem; font-size: 0.875rem; margin-bottom: 1rem; }
.warning { background: #fffbeb; border: 1px solid #fde68a; color: #b45309; border-radius: 0.5rem; padding: 0.75rem 1rem; font-size: 0.875rem; margin-bottom: 1rem; }
.empty { text-align: center; color: #6b7280; padding: 4rem 0; }
.kv { border-top: 1px solid #e5e7eb; }
.kv div { display: grid; grid-template-columns: 1fr 2fr; gap: 1rem; padding: 1rem; font-size: 0.875rem; }
.kv div:nth-child(odd) { background: #f9fafb; }
.kv dt { color: #6b7280; font-weight: 500; }
pre { background: #f3f4f6; border-radius: 0.5rem; padding: 1rem; font-size: 0.8rem; overflow-x: auto; }
a { color: #4f46e5; text-decoration: none; }
a:hover { opacity: 0.85; }
.tile-link { display: block; color: inherit; }
"#;
            std::fs::create_dir_all("assets/css").ok();
            std::fs::write("assets/css/output.css", fallback).ok();
        }
    }
}
