use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::*;
use crate::asset::ArtifactWriter;
use crate::config::{Config, StyleCompiler, test_project};
use crate::task::{PipelineError, TaskReport};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> (tempfile::TempDir, Config) {
    let (temp, mut config) = test_project();
    config.styles.compiler = StyleCompiler::Builtin;
    (temp, config)
}

fn run(config: Config, pipeline: &Pipeline) -> Result<Vec<TaskReport>, PipelineError> {
    let config = Arc::new(config);
    let writer = ArtifactWriter::new(&config.build_dir);
    pipeline.run(&registry(&config), &writer, None)
}

fn read(config: &Config, rel: &str) -> String {
    fs::read_to_string(config.build_dir.join(rel)).unwrap()
}

/// Every file under the build directory with its bytes, sorted.
fn snapshot(config: &Config) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = jwalk::WalkDir::new(&config.build_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let path = e.path();
            let rel = crate::utils::path::relative_slash_path(&path, &config.build_dir).unwrap();
            (rel, fs::read(&path).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_build_minifies_styles_and_bundles_empty_scripts() {
    let (_temp, config) = project();
    write(&config.source_dir, "scss/style.scss", "body { color: red; }\n");
    fs::create_dir_all(config.source_dir.join("js")).unwrap();

    run(config.clone(), &build_pipeline()).unwrap();

    assert_eq!(read(&config, "css/style.min.css"), "body{color:red}");
    assert_eq!(read(&config, "js/script.min.js"), "");
    assert_eq!(read(&config, "js/vendors.min.js"), "");
    // No sources, no sprite.
    assert!(!config.build_dir.join("img/sprite-svg.svg").exists());
}

#[test]
fn test_rebuild_is_byte_identical() {
    let (_temp, config) = project();
    write(&config.source_dir, "scss/style.scss", ".a { .b { color: red; } }");
    write(&config.source_dir, "js/app.js", "function add(a, b) { return a + b; }\nadd(1, 2);\n");
    write(&config.source_dir, "index.html", "<html><body></body></html>");
    write(&config.source_dir, "svg/close.svg", "<svg viewBox=\"0 0 1 1\"><path d=\"M0 0\"/></svg>");

    run(config.clone(), &build_pipeline()).unwrap();
    let first = snapshot(&config);
    run(config.clone(), &build_pipeline()).unwrap();
    assert_eq!(snapshot(&config), first);

    // Without the clean step nothing is rewritten.
    let reports = run(config.clone(), &assets_pipeline()).unwrap();
    assert!(reports.iter().all(|r| r.written.is_empty()), "{reports:?}");
    assert_eq!(snapshot(&config), first);
}

#[test]
fn test_clean_build_drops_removed_sources() {
    let (_temp, config) = project();
    write(&config.source_dir, "css/old.css", "a{}");
    write(&config.source_dir, "img/logo.png", "png");
    run(config.clone(), &build_pipeline()).unwrap();
    assert!(config.build_dir.join("css/old.css").is_file());

    fs::remove_file(config.source_dir.join("css/old.css")).unwrap();
    run(config.clone(), &build_pipeline()).unwrap();

    assert!(!config.build_dir.join("css/old.css").exists());
    assert_eq!(read(&config, "img/logo.png"), "png");
}

#[test]
fn test_partials_are_not_entries() {
    let (_temp, config) = project();
    write(&config.source_dir, "scss/_vars.scss", ".v { color: red; }");
    write(&config.source_dir, "scss/blocks/_header.scss", ".header { .logo { width: 1px; } }");
    write(&config.source_dir, "scss/main.scss", "@import \"vars\";\n@import \"blocks/*\";\n");

    run(config.clone(), &Pipeline::task(STYLES)).unwrap();

    let css = read(&config, "css/main.min.css");
    assert!(css.contains(".v{color:red}"), "{css}");
    assert!(css.contains(".header .logo{width:1px}"), "{css}");
    assert!(!config.build_dir.join("css/_vars.min.css").exists());
}

#[test]
fn test_style_error_names_file() {
    let (_temp, config) = project();
    write(&config.source_dir, "scss/style.scss", "@import \"nope\";");

    let err = run(config.clone(), &Pipeline::task(STYLES)).unwrap_err();
    let failure = &err.failures()[0];
    assert_eq!(failure.task, STYLES);
    assert!(failure.error.to_string().contains("style.scss"));
}

#[test]
fn test_missing_sass_binary_is_a_task_error() {
    let (_temp, mut config) = project();
    config.styles.compiler = StyleCompiler::Sass;
    write(&config.source_dir, "scss/style.scss", "a { color: red; }");

    // Only meaningful where no `sass` is installed.
    if which::which("sass").is_ok() {
        return;
    }
    let err = run(config, &Pipeline::task(STYLES)).unwrap_err();
    assert!(err.to_string().contains("sass"));
}

#[test]
fn test_scripts_bundle_in_name_order() {
    let (_temp, mut config) = project();
    config.scripts.minify = false;
    write(&config.source_dir, "js/b.js", "var b = 2;\n");
    write(&config.source_dir, "js/a.js", "var a = 1;\n");
    write(&config.source_dir, "js/lib/skip.js", "var skip;\n");

    run(config.clone(), &Pipeline::task(SCRIPTS)).unwrap();
    assert_eq!(read(&config, "js/script.min.js"), "var a = 1;\nvar b = 2;");
}

#[test]
fn test_scripts_minified() {
    let (_temp, config) = project();
    write(&config.source_dir, "js/app.js", "function add(first, second) {\n  return first + second;\n}\nadd(1, 2);\n");

    run(config.clone(), &Pipeline::task(SCRIPTS)).unwrap();
    let bundle = read(&config, "js/script.min.js");
    assert!(!bundle.contains('\n'));
    assert!(!bundle.contains("first"));
}

#[test]
fn test_vendors_concatenated_in_order() {
    let (_temp, mut config) = project();
    write(&config.root, "vendor/z.js", "/* z */ var z;");
    write(&config.root, "vendor/a.js", "/* a */ var a;\n");
    config.scripts.vendors = vec![config.root.join("vendor/z.js"), config.root.join("vendor/a.js")];

    run(config.clone(), &Pipeline::task(SCRIPTS_VENDORS)).unwrap();
    assert_eq!(read(&config, "js/vendors.min.js"), "/* z */ var z;\n/* a */ var a;");
}

#[test]
fn test_missing_vendor_fails_task() {
    let (_temp, mut config) = project();
    let missing = config.root.join("vendor/jquery.js");
    config.scripts.vendors = vec![missing.clone()];

    let err = run(config.clone(), &Pipeline::task(SCRIPTS_VENDORS)).unwrap_err();
    let failure = &err.failures()[0];
    assert_eq!(failure.task, SCRIPTS_VENDORS);
    assert!(matches!(&failure.error, TaskError::Missing(path) if *path == missing));
    assert!(!config.build_dir.join("js/vendors.min.js").exists());
}

#[test]
fn test_failing_task_does_not_stop_siblings() {
    let (_temp, mut config) = project();
    config.scripts.vendors = vec![config.root.join("missing.js")];
    write(&config.source_dir, "index.html", "<p>ok</p>");

    let err = run(config.clone(), &build_pipeline()).unwrap_err();
    assert_eq!(err.failures().len(), 1);
    assert_eq!(read(&config, "index.html"), "<p>ok</p>");
}

#[test]
fn test_html_dev_blocks() {
    let (_temp, mut config) = project();
    let page = "<body>\n  <!--DEV <script src=\"debug.js\"></script> -->\n</body>";
    write(&config.source_dir, "index.html", page);
    write(&config.source_dir, "pages/nested.html", page);

    run(config.clone(), &Pipeline::task(HTML)).unwrap();
    assert_eq!(read(&config, "index.html"), "<body>\n</body>");
    assert!(!config.build_dir.join("pages").exists());

    config.html.strip_dev_blocks = false;
    run(config.clone(), &Pipeline::task(HTML)).unwrap();
    assert_eq!(read(&config, "index.html"), page);
}

#[test]
fn test_svg_sprite() {
    let (_temp, config) = project();
    write(&config.source_dir, "svg/b.svg", "<svg viewBox=\"0 0 2 2\"><use xlink:href=\"#x\"/></svg>");
    write(&config.source_dir, "svg/a.svg", "<!-- a --><svg viewBox=\"0 0 1 1\"><path d=\"M0 0\"/></svg>");

    run(config.clone(), &Pipeline::task(SVG_SPRITE)).unwrap();
    assert_eq!(
        read(&config, "img/sprite-svg.svg"),
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
            r#"<symbol id="a" viewBox="0 0 1 1"><path d="M0 0"/></symbol>"#,
            r##"<symbol id="b" viewBox="0 0 2 2"><use xlink:href="#x"/></symbol>"##,
            "</svg>"
        )
    );
}

#[test]
fn test_images_and_css_copied_verbatim() {
    let (_temp, config) = project();
    write(&config.source_dir, "img/photo.jpg", "jpg");
    write(&config.source_dir, "img/notes.txt", "txt");
    write(&config.source_dir, "css/vendor.css", "a { color : red }");

    run(config.clone(), &assets_pipeline()).unwrap();
    assert_eq!(read(&config, "img/photo.jpg"), "jpg");
    assert!(!config.build_dir.join("img/notes.txt").exists());
    assert_eq!(read(&config, "css/vendor.css"), "a { color : red }");
}

#[test]
fn test_registry_has_every_task() {
    let (_temp, config) = project();
    let registry = registry(&Arc::new(config));
    let mut names: Vec<_> = registry.names().collect();
    names.sort_unstable();
    let mut expected = ASSET_TASKS.to_vec();
    expected.push(CLEAN);
    expected.sort_unstable();
    assert_eq!(names, expected);
    assert!(build_pipeline().validate(&registry).is_ok());
}

#[test]
fn test_default_watch_bindings() {
    let bindings = default_watch_bindings().unwrap();
    let bound = |rel: &str| -> Vec<&str> {
        bindings
            .iter()
            .filter(|b| b.matches(rel))
            .flat_map(|b| b.pipeline().task_names())
            .collect()
    };

    assert_eq!(bound("scss/blocks/_header.scss"), vec![STYLES]);
    assert_eq!(bound("js/app.js"), vec![SCRIPTS]);
    assert!(bound("js/lib/app.js").is_empty());
    assert_eq!(bound("index.html"), vec![HTML]);
    assert!(bound("pages/about.html").is_empty());
    assert_eq!(bound("img/icons/a.png"), vec![IMAGES]);
    assert_eq!(bound("svg/close.svg"), vec![SVG_SPRITE]);
    assert_eq!(bound("css/vendor.css"), vec![CSS_COPY]);
}
