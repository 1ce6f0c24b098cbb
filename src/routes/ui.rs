use axum::{response::Html, routing::get, Router};

use crate::models::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>LabMate - AI Copilot for Wet Lab Protocols</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    h1 { margin-bottom: 0.5rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    .row { display: flex; gap: 1rem; }
    .row > div { flex: 1; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    input, textarea, select { width: 100%; padding: 0.5rem; box-sizing: border-box; }
    button { margin-top: 1rem; margin-right: 0.5rem; padding: 0.6rem 1rem; }
    pre { background: #f6f8fa; padding: 1rem; overflow: auto; white-space: pre-wrap; }
    .status { margin-top: 0.5rem; color: #555; }
  </style>
</head>
<body>
  <h1>LabMate</h1>
  <p>1. Pick or customize the instruction template. 2. Paste or import your protocol. 3. Click Optimize.</p>

  <div class="card">
    <h2>1) Instruction template</h2>
    <div class="row">
      <div><label>Protocol type</label><select id="protocolType"></select></div>
      <div><label>Saved template</label><select id="templateChoice"></select></div>
      <div><label>Saved preset</label><select id="presetChoice"></select></div>
    </div>
    <button id="resetBtn">Reset to default for selected type</button>
    <label>Instruction (editable, use {protocol_text} where the protocol goes)</label>
    <textarea id="instruction" rows="14"></textarea>
    <div class="row">
      <div>
        <label>Template name</label><input id="templateName" />
        <button id="saveTemplateBtn">Save instruction template</button>
        <button id="deleteTemplateBtn">Delete selected template</button>
      </div>
      <div>
        <label>Preset name</label><input id="presetName" />
        <button id="savePresetBtn">Save full preset</button>
        <button id="deletePresetBtn">Delete selected preset</button>
      </div>
    </div>
    <div class="status" id="templateStatus"></div>
  </div>

  <div class="card">
    <h2>2) Protocol</h2>
    <textarea id="protocol" rows="10" placeholder="Paste the raw protocol steps here"></textarea>
    <label>Import file (.txt, .md, .pdf)</label>
    <input id="fileInput" type="file" />
    <button id="importBtn">Import</button>
    <label>Addgene plasmid ID</label>
    <input id="plasmidId" />
    <button id="plasmidBtn">Add plasmid context</button>
    <div class="status" id="protocolStatus"></div>
  </div>

  <div class="card">
    <h2>3) Run optimization</h2>
    <button id="optimizeBtn">Optimize</button>
    <a id="downloadLink" style="display:none">Download output</a>
    <pre id="output"></pre>
  </div>

  <script>
    const $ = (id) => document.getElementById(id);
    let sessionId = null;

    async function api(path, options = {}) {
      const res = await fetch(`/api/sessions/${sessionId}${path}`, options);
      if (res.status === 204) return {};
      const json = await res.json();
      if (!res.ok) throw new Error(json.error || res.statusText);
      return json;
    }

    function jsonBody(method, payload) {
      return { method, headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(payload) };
    }

    function fillSelect(select, names) {
      select.innerHTML = '';
      for (const name of ['-- none --', ...names]) {
        const opt = document.createElement('option');
        opt.value = name === '-- none --' ? '' : name;
        opt.textContent = name;
        select.appendChild(opt);
      }
    }

    async function refreshSaved() {
      fillSelect($('templateChoice'), (await api('/templates')).names);
      fillSelect($('presetChoice'), (await api('/presets')).names);
    }

    async function resolveInstruction() {
      const params = new URLSearchParams({ protocol_type: $('protocolType').value });
      if ($('templateChoice').value) params.set('template', $('templateChoice').value);
      if ($('presetChoice').value) params.set('preset', $('presetChoice').value);
      const resolved = await api(`/instruction?${params}`);
      $('protocolType').value = resolved.protocol_type;
      $('instruction').value = resolved.instruction;
    }

    async function start() {
      const types = await (await fetch('/api/protocol-types')).json();
      const select = $('protocolType');
      for (const t of types.protocol_types) {
        const opt = document.createElement('option');
        opt.value = t; opt.textContent = t;
        select.appendChild(opt);
      }
      const created = await (await fetch('/api/sessions', { method: 'POST' })).json();
      sessionId = created.session_id;
      select.value = created.protocol_type;
      $('instruction').value = created.instruction;
      await refreshSaved();
    }

    $('protocolType').addEventListener('change', resolveInstruction);
    $('templateChoice').addEventListener('change', resolveInstruction);
    $('presetChoice').addEventListener('change', resolveInstruction);

    $('resetBtn').addEventListener('click', async () => {
      const resolved = await api('/instruction/reset', jsonBody('POST', { protocol_type: $('protocolType').value }));
      $('instruction').value = resolved.instruction;
    });

    $('saveTemplateBtn').addEventListener('click', async () => {
      try {
        const saved = await api('/templates', jsonBody('POST', { name: $('templateName').value, instruction: $('instruction').value }));
        $('templateStatus').textContent = saved.message;
        await refreshSaved();
      } catch (e) { $('templateStatus').textContent = e.message; }
    });

    $('deleteTemplateBtn').addEventListener('click', async () => {
      const name = $('templateChoice').value;
      if (!name) return;
      await api(`/templates/${encodeURIComponent(name)}`, { method: 'DELETE' });
      $('templateStatus').textContent = `Deleted instruction template '${name}'`;
      await refreshSaved();
    });

    $('savePresetBtn').addEventListener('click', async () => {
      try {
        const saved = await api('/presets', jsonBody('POST', {
          name: $('presetName').value,
          protocol_type: $('protocolType').value,
          instruction: $('instruction').value
        }));
        $('templateStatus').textContent = saved.message;
        await refreshSaved();
      } catch (e) { $('templateStatus').textContent = e.message; }
    });

    $('deletePresetBtn').addEventListener('click', async () => {
      const name = $('presetChoice').value;
      if (!name) return;
      await api(`/presets/${encodeURIComponent(name)}`, { method: 'DELETE' });
      $('templateStatus').textContent = `Deleted full preset '${name}'`;
      await refreshSaved();
    });

    $('importBtn').addEventListener('click', async () => {
      const fileInput = $('fileInput');
      if (!fileInput.files.length) {
        $('protocolStatus').textContent = 'Select a file first.';
        return;
      }
      const formData = new FormData();
      formData.append('file', fileInput.files[0]);
      try {
        const protocol = await api('/protocol/import', { method: 'POST', body: formData });
        $('protocol').value = protocol.text;
        $('protocolStatus').textContent = `Imported ${protocol.source_file}`;
      } catch (e) { $('protocolStatus').textContent = e.message; }
    });

    $('plasmidBtn').addEventListener('click', async () => {
      try {
        await api('/protocol', jsonBody('PUT', { text: $('protocol').value }));
        const res = await api('/protocol/plasmid', jsonBody('POST', { plasmid_id: $('plasmidId').value }));
        $('protocol').value = res.protocol.text;
        $('protocolStatus').textContent = `${res.plasmid.name}: ${res.plasmid.features.join(', ')} (${res.plasmid.url})`;
      } catch (e) { $('protocolStatus').textContent = e.message; }
    });

    $('optimizeBtn').addEventListener('click', async () => {
      $('output').textContent = 'Optimizing...';
      $('downloadLink').style.display = 'none';
      try {
        const outcome = await api('/optimize', jsonBody('POST', {
          protocol_text: $('protocol').value,
          instruction: $('instruction').value
        }));
        if (outcome.status === 'warning') {
          $('output').textContent = outcome.message;
          return;
        }
        $('output').textContent = (outcome.prompt_warning ? outcome.prompt_warning + '\n\n' : '') + outcome.text;
        const link = $('downloadLink');
        link.href = `/api/sessions/${sessionId}/result/download`;
        link.download = outcome.download_name;
        link.style.display = 'inline';
      } catch (e) { $('output').textContent = e.message; }
    });

    window.addEventListener('beforeunload', () => {
      if (sessionId) fetch(`/api/sessions/${sessionId}`, { method: 'DELETE', keepalive: true });
    });

    start();
  </script>
</body>
</html>"#)
}
